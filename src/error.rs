use thiserror::Error;

/// Failure returned by the chapter content loader collaborator. The core
/// propagates it verbatim and never interprets or retries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load chapter {chapter}: {reason}")]
pub struct ChapterLoadError {
    pub chapter: usize,
    pub reason: String,
}

impl ChapterLoadError {
    pub fn new(chapter: usize, reason: impl Into<String>) -> Self {
        Self {
            chapter,
            reason: reason.into(),
        }
    }
}

/// Navigation failure taxonomy.
///
/// `EndOfBook`/`StartOfBook` are expected boundary conditions, not faults:
/// the reader is already at the last (or first) page and the state stays at
/// the last valid position. `InvalidArgument` reports a malformed or
/// unresolvable chapter URL without mutating state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("already at the end of the book")]
    EndOfBook,

    #[error("already at the start of the book")]
    StartOfBook,

    #[error("invalid argument: {details}")]
    InvalidArgument { details: String },

    #[error(transparent)]
    ChapterLoad(#[from] ChapterLoadError),
}

impl NavigationError {
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::InvalidArgument {
            details: details.into(),
        }
    }

    /// True for the two expected edge-of-book conditions.
    pub fn is_book_boundary(&self) -> bool {
        matches!(self, Self::EndOfBook | Self::StartOfBook)
    }
}

use crate::error::ChapterLoadError;

/// The chapter content collaborator. `fetch` resolves once the chapter's
/// content is attached to the rendering surface; transport failures come back
/// as [`ChapterLoadError`] and are propagated uninterpreted by the core.
pub trait ChapterLoader {
    fn fetch(&mut self, chapter: usize) -> Result<(), ChapterLoadError>;
}

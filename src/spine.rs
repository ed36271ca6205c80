use serde::{Deserialize, Serialize};

/// One entry in the book's reading order.
///
/// Non-linear chapters (supplementary material) are excluded from progress
/// accounting but still navigable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRef {
    pub href: String,
    #[serde(default = "default_linear")]
    pub linear: bool,
    #[serde(default)]
    pub word_count: u64,
}

fn default_linear() -> bool {
    true
}

impl ChapterRef {
    pub fn new(href: impl Into<String>, linear: bool, word_count: u64) -> Self {
        Self {
            href: href.into(),
            linear,
            word_count,
        }
    }
}

/// Ordered chapter metadata supplied at book-open time. Read-only to every
/// navigation component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spine {
    entries: Vec<ChapterRef>,
}

impl Spine {
    pub fn new(entries: Vec<ChapterRef>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChapterRef> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterRef> {
        self.entries.iter()
    }

    /// First entry whose href contains `path` (already stripped of any
    /// directory prefix by the caller).
    pub fn find_by_path(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|c| c.href.contains(path))
    }

    /// Total word count over linear chapters only.
    pub fn linear_word_count(&self) -> u64 {
        self.entries
            .iter()
            .filter(|c| c.linear)
            .map(|c| c.word_count)
            .sum()
    }
}

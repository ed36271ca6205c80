use crate::locator::Locator;

/// The single mutable position record, exclusively owned by the navigation
/// controller. Page/chapter helpers operate on a borrowed `&mut` reference;
/// nothing else in the crate holds onto it.
///
/// Invariants: `page <= pages_in_chapter` (`pages_in_chapter` is the index of
/// the last page, so equality means "on the last page"), and
/// `chapter < spine.len()` whenever the spine is non-empty. The locator is
/// the durable restatement of `(chapter, page)` plus a sub-page anchor; it
/// can be stale right after a reflow until recaptured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    pub chapter: usize,
    pub page: usize,
    pub pages_in_chapter: usize,
    pub locator: Option<Locator>,
    pub chapter_doc_name: String,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the documented initial values: chapter 0, page 0, no pages
    /// counted, no captured locator, no doc name.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::layout::ElementHandle;

static CFI_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^epubcfi\(.+\)$").expect("valid locator regex"));

/// Durable, serializable reference to a position within the book, in the
/// canonical `epubcfi(...)` fragment-identifier shape. Opaque to this core:
/// only the locator service can resolve it back to a page or element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the string has the canonical fragment-identifier shape.
    pub fn looks_like_locator(raw: &str) -> bool {
        CFI_SHAPE.is_match(raw)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of resolving a locator against the currently attached chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Page(usize),
    Element(ElementHandle),
    NotFound,
}

/// The locator (CFI) collaborator: serializes the current position into a
/// durable string and resolves such strings back after content reflow.
pub trait LocatorService {
    /// Snapshot a locator for the given chapter/page, or `None` when the
    /// position cannot currently be expressed (e.g. no content attached).
    fn capture(&self, chapter: usize, page: usize) -> Option<Locator>;

    fn resolve(&self, locator: &Locator) -> Resolution;
}

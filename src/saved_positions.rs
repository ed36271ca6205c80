use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::locator::Locator;

/// Snapshot of where the reader left off in one book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPosition {
    pub chapter: usize,
    pub page: usize,
    #[serde(default)]
    pub locator: Option<Locator>,
    #[serde(default)]
    pub percent: u8,
    pub last_read: chrono::DateTime<chrono::Utc>,
}

/// Per-book reading positions, keyed by book identifier, optionally persisted
/// to a JSON file. Save errors are logged, never propagated: losing a resume
/// point must not break navigation.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedPositions {
    books: HashMap<String, SavedPosition>,
    #[serde(skip)]
    file_path: Option<String>,
}

impl SavedPositions {
    pub fn ephemeral() -> Self {
        Self {
            books: HashMap::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &str) -> Self {
        Self {
            books: HashMap::new(),
            file_path: Some(file_path.to_string()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&str>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load saved positions from {path}: {e}");
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let path = Path::new(file_path);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut positions: Self = serde_json::from_str(&content)?;
            positions.file_path = Some(file_path.to_string());
            Ok(positions)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                let content = serde_json::to_string_pretty(self)?;
                fs::write(path, content)?;
                Ok(())
            }
            // Ephemeral stores don't touch disk.
            None => Ok(()),
        }
    }

    pub fn get(&self, book: &str) -> Option<&SavedPosition> {
        self.books.get(book)
    }

    pub fn most_recent(&self) -> Option<(String, &SavedPosition)> {
        self.books
            .iter()
            .max_by_key(|(_, position)| position.last_read)
            .map(|(book, position)| (book.clone(), position))
    }

    pub fn record(&mut self, book: &str, chapter: usize, page: usize, locator: Option<Locator>, percent: u8) {
        self.books.insert(
            book.to_string(),
            SavedPosition {
                chapter,
                page,
                locator,
                percent,
                last_read: chrono::Utc::now(),
            },
        );
        if self.file_path.is_some() {
            if let Err(e) = self.save() {
                log::error!("Failed to save reading position: {e}");
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SavedPosition)> {
        self.books.iter()
    }
}

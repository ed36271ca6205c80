// Export modules for use in tests and embedding hosts
pub mod chapter;
pub mod config;
pub mod error;
pub mod events;
pub mod gesture;
pub mod images;
pub mod layout;
pub mod loader;
pub mod locator;
pub mod navigation;
pub mod page;
pub mod position;
pub mod progress;
pub mod saved_positions;
pub mod sim;
pub mod spine;

// Re-export the core surface
pub use config::Preferences;
pub use error::{ChapterLoadError, NavigationError};
pub use events::ReaderEvent;
pub use gesture::{GestureClassifier, GestureOutcome, TapTarget};
pub use layout::{ElementHandle, LayoutSurface, PageBox};
pub use loader::ChapterLoader;
pub use locator::{Locator, LocatorService, Resolution};
pub use navigation::Navigation;
pub use page::PageTarget;
pub use saved_positions::SavedPositions;
pub use spine::{ChapterRef, Spine};

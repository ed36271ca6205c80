use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const PREFERENCES_FILENAME: &str = "preferences.yaml";
const APP_NAME: &str = "pageflow";

/// The formatting collaborator's values this core consumes. The full
/// font/margin/theme preference machinery lives outside the navigation core;
/// only the timings it exposes and its layout-changed signal (delivered as a
/// `Navigation::refresh_layout` call) cross the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Window in which a second tap counts as a double tap.
    #[serde(default = "default_double_tap_delay_ms")]
    pub double_tap_delay_ms: u64,

    /// Duration of the snap-back/rollback scroll animation.
    #[serde(default = "default_transition_duration_ms")]
    pub transition_duration_ms: u64,
}

fn default_double_tap_delay_ms() -> u64 {
    300
}

fn default_transition_duration_ms() -> u64 {
    150
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            double_tap_delay_ms: default_double_tap_delay_ms(),
            transition_duration_ms: default_transition_duration_ms(),
        }
    }
}

impl Preferences {
    /// Load from the user config directory, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(prefs) => {
                    debug!("loaded preferences from {}", path.display());
                    prefs
                }
                Err(e) => {
                    error!("malformed preferences at {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(PREFERENCES_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_for_missing_fields() {
        let prefs: Preferences = serde_yaml::from_str("double_tap_delay_ms: 500\n").unwrap();
        assert_eq!(prefs.double_tap_delay_ms, 500);
        assert_eq!(prefs.transition_duration_ms, 150);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.yaml");
        let prefs = Preferences {
            double_tap_delay_ms: 450,
            transition_duration_ms: 200,
        };
        prefs.save_to(&path).unwrap();
        assert_eq!(Preferences::load_from(&path), prefs);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yaml");
        assert_eq!(Preferences::load_from(&path), Preferences::default());
    }
}

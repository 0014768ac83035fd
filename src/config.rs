//! Configuration for the 3270 input and scripting core
//!
//! Settings are a flat serde-serialized profile stored as JSON, either at an
//! explicit path or under the platform configuration directory. Only the
//! toggles the input core actually consults live here; display and network
//! preferences belong to the layers that own them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Emulator profile consulted by the keyboard, paste, and script paths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    /// 3278 model number (2-5), which fixes the screen dimensions
    pub model: u8,

    /// Lock the keyboard on operator errors instead of ringing the bell
    pub oerr_lock: bool,

    /// Queue input typed while the keyboard is locked
    pub typeahead: bool,

    /// Treat trailing blanks as empty space and pre-fill leading nulls
    /// with blanks when typing into formatted fields
    pub blank_fill: bool,

    /// Stop a paste that would stray left of the column it started in
    pub margined_paste: bool,

    /// Map `[` and `]` to APL bracket glyphs while pasting
    pub apl_mode: bool,

    /// Delay before a host-initiated keyboard reset takes effect
    pub unlock_delay_ms: u64,

    /// Emit command timing in script replies
    pub show_timing: bool,

    /// Compose-key mappings, one `a + b = c` entry per line;
    /// None selects the built-in table
    pub compose_map: Option<String>,

    /// Macro source executed automatically when a connection completes
    pub login_macro: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            model: 2,
            oerr_lock: true,
            typeahead: true,
            blank_fill: false,
            margined_paste: false,
            apl_mode: false,
            unlock_delay_ms: 350,
            show_timing: true,
            compose_map: None,
            login_macro: None,
        }
    }
}

impl Profile {
    /// Screen rows for the configured model
    pub fn rows(&self) -> usize {
        match self.model {
            3 => 32,
            4 => 43,
            5 => 27,
            _ => 24,
        }
    }

    /// Screen columns for the configured model
    pub fn cols(&self) -> usize {
        match self.model {
            5 => 132,
            _ => 80,
        }
    }

    /// Load a profile from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save the profile as JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::File {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        fs::write(path, text).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Default profile location under the platform configuration directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tn3270r").join("profile.json"))
    }

    /// Load the profile from the default location, falling back to defaults
    /// if the file does not exist or cannot be parsed
    pub fn load_default() -> Self {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(profile) => return profile,
                    Err(e) => log::warn!("ignoring unreadable profile: {e}"),
                }
            }
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let p = Profile::default();
        assert_eq!(p.model, 2);
        assert_eq!(p.rows(), 24);
        assert_eq!(p.cols(), 80);
        assert!(p.typeahead);
        assert_eq!(p.unlock_delay_ms, 350);
    }

    #[test]
    fn test_model_dimensions() {
        let mut p = Profile::default();
        p.model = 4;
        assert_eq!((p.rows(), p.cols()), (43, 80));
        p.model = 5;
        assert_eq!((p.rows(), p.cols()), (27, 132));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p: Profile = serde_json::from_str(r#"{"model": 3}"#).unwrap();
        assert_eq!(p.model, 3);
        assert!(p.oerr_lock);
        assert!(p.compose_map.is_none());
    }
}

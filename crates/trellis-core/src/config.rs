//! Runtime settings loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use trellis_engine::engine::GridBounds;

/// Document defaults. Unknown keys are rejected so typos in a config file
/// surface instead of silently falling back.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Default grid shape for new documents.
    pub rows: usize,
    pub cols: usize,
    pub tables: usize,
    /// Maximum number of undo transactions kept.
    pub undo_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rows: 1000,
            cols: 100,
            tables: 3,
            undo_limit: 100,
        }
    }
}

impl Settings {
    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.rows, self.cols, self.tables)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bounds().rows, 1000);
        assert_eq!(settings.bounds().cols, 100);
        assert_eq!(settings.bounds().tables, 3);
        assert_eq!(settings.undo_limit, 100);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str("rows = 50").unwrap();
        assert_eq!(settings.rows, 50);
        assert_eq!(settings.cols, 100);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<Settings>("rowz = 50").is_err());
    }
}

//! Per-store configuration loaded from `.questlog/config.yaml`.
//!
//! The file is optional; missing keys fall back to defaults.
//!
//! ```yaml
//! leveling:
//!   base_xp: 100
//!   growth_rate: 1.2
//!   max_level: 100
//! ```

use crate::leveling::LevelConfig;
use crate::storage::QUESTLOG_DIR;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name within the .questlog directory.
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestlogConfig {
    /// XP curve parameters
    pub leveling: LevelConfig,
}

impl QuestlogConfig {
    /// Path of the config file for a store root.
    pub fn path(root: &Path) -> PathBuf {
        root.join(QUESTLOG_DIR).join(CONFIG_FILE)
    }

    /// Load the config for a store, or defaults when no file exists.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?
        };

        config
            .leveling
            .validate()
            .with_context(|| format!("Invalid leveling settings in {}", path.display()))?;

        log::debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Write the config to the store's config file.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        let text = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leveling::{BASE_XP, MAX_LEVEL};
    use tempfile::TempDir;

    fn setup_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(QUESTLOG_DIR)).unwrap();
        temp_dir
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = setup_dir();
        let config = QuestlogConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, QuestlogConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let temp_dir = setup_dir();
        fs::write(
            QuestlogConfig::path(temp_dir.path()),
            "leveling:\n  growth_rate: 1.5\n",
        )
        .unwrap();

        let config = QuestlogConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.leveling.base_xp, BASE_XP);
        assert_eq!(config.leveling.growth_rate, 1.5);
        assert_eq!(config.leveling.max_level, MAX_LEVEL);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = setup_dir();
        fs::write(QuestlogConfig::path(temp_dir.path()), "leveling:\n  base_xp: 0\n").unwrap();

        assert!(QuestlogConfig::load(temp_dir.path()).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = setup_dir();
        let mut config = QuestlogConfig::default();
        config.leveling.max_level = 50;
        config.save(temp_dir.path()).unwrap();

        assert_eq!(QuestlogConfig::load(temp_dir.path()).unwrap(), config);
    }
}

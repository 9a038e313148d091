//! TOML-based application configuration.
//!
//! Stores ambient settings the engine itself does not persist:
//! - the default user id the CLI acts as
//! - the fallback timezone offset for users without stored preferences
//! - sweep batch size and watch-mode interval
//!
//! Configuration is stored at `~/.config/nudgekeeper/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Sweep tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Upper bound on commitments examined per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Cadence of the `sweep watch` trigger, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/nudgekeeper/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// User id the CLI acts as when `--user` is not given.
    #[serde(default = "default_user")]
    pub default_user: String,
    /// Fixed UTC offset applied when a user has no stored preferences,
    /// e.g. `"+08:00"`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_user: default_user(),
            timezone: default_timezone(),
            sweep: SweepConfig::default(),
        }
    }
}

fn default_user() -> String {
    "local".to_string()
}

fn default_timezone() -> String {
    "+00:00".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_interval_secs() -> u64 {
    300
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/nudgekeeper"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file
    /// does not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Load from an explicit path (used by tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist the configuration.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    /// Persist to an explicit path (used by tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.default_user, "local");
        assert_eq!(config.timezone, "+00:00");
        assert_eq!(config.sweep.batch_size, 50);
        assert_eq!(config.sweep.interval_secs, 300);
    }

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.default_user = "mei".to_string();
        config.timezone = "+08:00".to_string();
        config.sweep.interval_secs = 60;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_user, "mei");
        assert_eq!(loaded.timezone, "+08:00");
        assert_eq!(loaded.sweep.interval_secs, 60);
        assert_eq!(loaded.sweep.batch_size, 50);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_user = \"kai\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_user, "kai");
        assert_eq!(loaded.timezone, "+00:00");
        assert_eq!(loaded.sweep.batch_size, 50);
    }
}

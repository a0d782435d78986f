//! passgen configuration
//!
//! Settings are layered, later wins:
//! 1. built-in defaults
//! 2. ~/.config/passgen/config.yaml
//! 3. the PASSGEN_STORE environment variable (store path only)
//! 4. command-line flags, applied by the binary

use crate::paths::Paths;
use crate::policy::{Length, Policy};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the store path
pub const STORE_ENV: &str = "PASSGEN_STORE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write config {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize config")]
    Serialize(#[from] serde_yaml::Error),
}

/// Effective passgen settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the record store lives
    pub store_path: PathBuf,
    /// Policy used when none is given
    pub policy: Policy,
    /// Length used when none is given
    pub length: Length,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: Paths::default_store(),
            policy: Policy::Medium,
            length: Length::DEFAULT,
        }
    }
}

impl Config {
    /// Load from the default config file, then apply the environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_from(&Paths::new().config_file())?;
        Ok(config.with_store_override(std::env::var_os(STORE_ENV)))
    }

    /// Load from a specific file; a missing file gives the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file deserializes to null, not to the defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the store path if `value` is set and non-empty
    pub fn with_store_override(mut self, value: Option<OsString>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            debug!(store = ?value, "store path overridden from {}", STORE_ENV);
            self.store_path = PathBuf::from(value);
        }
        self
    }

    /// Write this config as YAML
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store_path, PathBuf::from("passwords.json"));
        assert_eq!(config.policy, Policy::Medium);
        assert_eq!(config.length.get(), 16);
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config::load_from(&tmp.path().join("config.yaml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "policy: advanced\n")?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.policy, Policy::Advanced);
        assert_eq!(config.length.get(), 16);
        assert_eq!(config.store_path, PathBuf::from("passwords.json"));
        Ok(())
    }

    #[test]
    fn test_empty_file_gives_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "\n")?;
        assert_eq!(Config::load_from(&path)?, Config::default());
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.yaml");

        fs::write(&path, "policy: extreme\n")?;
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "length: 1000\n")?;
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("nested").join("config.yaml");
        let config = Config {
            store_path: PathBuf::from("/var/lib/passgen/store.json"),
            policy: Policy::Symbols,
            length: Length::new(40)?,
        };
        config.save_to(&path)?;
        assert_eq!(Config::load_from(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_store_override() {
        let config = Config::default().with_store_override(Some("/tmp/other.json".into()));
        assert_eq!(config.store_path, PathBuf::from("/tmp/other.json"));

        let config = Config::default().with_store_override(Some(OsString::new()));
        assert_eq!(config.store_path, PathBuf::from("passwords.json"));

        let config = Config::default().with_store_override(None);
        assert_eq!(config.store_path, PathBuf::from("passwords.json"));
    }
}

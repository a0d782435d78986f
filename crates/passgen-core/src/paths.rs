//! Standard paths used by passgen

use std::path::PathBuf;

/// File name of the record store when nothing else is configured
pub const DEFAULT_STORE_FILE: &str = "passwords.json";

/// Standard passgen paths
pub struct Paths {
    /// Config directory (~/.config/passgen)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("passgen");

        Self { config }
    }

    /// Path of the YAML config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.yaml")
    }

    /// Default store location: a fixed file name in the working directory
    pub fn default_store() -> PathBuf {
        PathBuf::from(DEFAULT_STORE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_under_config_dir() {
        let paths = Paths::new();
        let file = paths.config_file();
        assert!(file.starts_with(&paths.config));
        assert_eq!(file.file_name().unwrap(), "config.yaml");
    }

    #[test]
    fn test_default_store_is_relative() {
        let store = Paths::default_store();
        assert!(store.is_relative());
        assert_eq!(store, PathBuf::from("passwords.json"));
    }
}

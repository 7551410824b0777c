use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error with file context
    #[error("failed to parse TOML at '{path}': {details}")]
    TomlParseError {
        /// Path of the file being parsed
        path: PathBuf,
        /// Parse error details
        details: String,
    },
}

/// Widget configuration, read from `$XDG_CONFIG_HOME/mediabar/config.toml`.
///
/// Every field is optional; a missing file means defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General widget settings
    pub general: GeneralConfig,

    /// Bus name substring patterns to skip during player discovery
    pub ignored_players: Vec<String>,
}

/// General settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default log level when `RUST_LOG` is not set
    pub log_level: Option<String>,
}

impl Config {
    /// Load the configuration from the default location.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load the configuration from an explicit path.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Default config file location, honoring `XDG_CONFIG_HOME`.
    pub fn config_path() -> Option<PathBuf> {
        let config_dir = match env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(env::var_os("HOME")?).join(".config"),
        };

        Some(config_dir.join("mediabar").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn loads_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
ignored_players = ["firefox", "kdeconnect"]

[general]
log_level = "debug"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ignored_players, vec!["firefox", "kdeconnect"]);
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.ignored_players.is_empty());
        assert!(config.general.log_level.is_none());
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ignored_players = 3").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }
}

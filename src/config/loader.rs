use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;
use crate::model::is_known_dialect;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/sqlcheck/config.toml` on Unix,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("sqlcheck").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Unknown dialects are allowed (the service decides), but logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.service.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                message: format!("service.base_url '{}' must start with http:// or https://", base_url),
            });
        }

        if self.service.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "service.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.service.connect_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "service.connect_timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.editor.debounce_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "editor.debounce_ms must be greater than 0".to_string(),
            });
        }

        let dialect = self.editor.dialect.trim();
        if dialect.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "editor.dialect must not be empty".to_string(),
            });
        }
        if !is_known_dialect(dialect) {
            tracing::warn!(dialect = %dialect, "Unknown dialect, passing it through unchanged");
        }

        Ok(())
    }
}

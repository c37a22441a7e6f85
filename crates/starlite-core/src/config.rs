//! Application configuration.
//!
//! [`AppConfig`] can be built in code or loaded from TOML. Every field is
//! optional in the file:
//!
//! ```toml
//! name = "inventory"
//! debug = true
//! max_body_size = 65536
//!
//! [log]
//! level = "debug"
//! ansi = true
//! ```

use std::path::Path;

use serde::Deserialize;
use starlite_router::ConfigError;

use crate::logging::LogConfig;
use crate::request::DEFAULT_MAX_BODY_SIZE;

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, used in log output.
    pub name: String,
    /// Render unexpected errors as detailed plain-text pages.
    pub debug: bool,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
    /// Logging settings.
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "starlite".to_string(),
            debug: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables debug error pages.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|err| ConfigError::InvalidConfig(err.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::InvalidConfig(format!("{}: {err}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), name = %config.name, "loaded configuration");
        Ok(config)
    }
}

//! Logging setup.
//!
//! The framework emits `tracing` events throughout: route registration and
//! trie validation at debug level, dispatch and middleware bypasses at
//! trace level, rejected requests at debug and failures at error level.
//! Fields are structured (`request_id`, `path`, `status`, ...).
//!
//! Applications that do not install their own subscriber can call
//! [`init_logging`], which installs a `tracing-subscriber` fmt layer
//! filtered by `RUST_LOG` or, when unset, the configured level.
//!
//! ```ignore
//! init_logging(&LogConfig::development());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, for detailed debugging.
    Trace,
    /// Debug information, not shown in production.
    Debug,
    /// General information about normal operation.
    #[default]
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// An error that affected request processing.
    Error,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum log level to emit when `RUST_LOG` is unset.
    pub level: LogLevel,
    /// Whether to include the target module path.
    pub include_target: bool,
    /// Whether to emit ANSI colours.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: true,
            ansi: false,
        }
    }
}

impl LogConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum log level.
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets whether to include the target module path.
    #[must_use]
    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Sets whether to emit ANSI colours.
    #[must_use]
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Verbose, coloured output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            ansi: true,
        }
    }

    /// Info and above, no colours.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Everything, no colours.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            level: LogLevel::Trace,
            include_target: true,
            ansi: false,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(config: &LogConfig) -> bool {
    let installed = tracing_subscriber::registry()
        .with(config.filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(config.include_target)
                .with_ansi(config.ansi),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(level = %config.level, "logging initialized");
    }
    installed
}

//! Configuration management for vcplay
//!
//! Bootstrap configuration is loaded from a TOML file; these settings cannot
//! change while the service is running. Command-line arguments override the
//! file (see `main.rs`).
//!
//! All fields carry built-in defaults so an empty (or absent) file yields a
//! working configuration.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the voice transport sidecar
    #[serde(default = "default_transport_url")]
    pub transport_url: String,

    /// Grace period before an idle chat's voice session is released, seconds
    #[serde(default = "default_idle_grace_secs")]
    pub idle_grace_secs: u64,

    /// Maximum pending items per chat queue (0 = unbounded)
    #[serde(default)]
    pub queue_limit: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_port() -> u16 {
    5770
}

fn default_transport_url() -> String {
    "http://127.0.0.1:5771".to_string()
}

fn default_idle_grace_secs() -> u64 {
    300 // five minutes before leaving an idle voice session
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            transport_url: default_transport_url(),
            idle_grace_secs: default_idle_grace_secs(),
            queue_limit: 0,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// An explicitly provided path must exist; `None` yields built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("invalid TOML in {}: {}", path.display(), e)))
            }
            None => Ok(Self::default()),
        }
    }

    /// Idle grace period as a `Duration`
    pub fn idle_grace(&self) -> Duration {
        Duration::from_secs(self.idle_grace_secs)
    }
}

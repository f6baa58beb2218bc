//! # Runtime Configuration
//!
//! JSON configuration shared by the host and its music backends.
//!
//! ## Overview
//!
//! A host typically ships one configuration file:
//!
//! ```json
//! {
//!   "log_level": "debug",
//!   "log_format": "compact",
//!   "playback": { "raw_block_bytes": 8192 }
//! }
//! ```
//!
//! Every field has a default, so an empty object is a valid configuration.
//! The `playback` section is kept as raw JSON; each backend parses its own
//! section so this crate does not depend on any of them.

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LoggingConfig};
use bridge_traits::time::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Minimum log level for our crates.
    ///
    /// Default: info.
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Output format for the fmt layer.
    ///
    /// Default: pretty in debug builds, json in release builds.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional `EnvFilter` directive string overriding `log_level`.
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Backend-specific playback settings, parsed by the backend.
    #[serde(default)]
    pub playback: serde_json::Value,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_filter: None,
            playback: serde_json::Value::Null,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(file = %crate::logging::strip_path(&path.to_string_lossy()), "Loading runtime config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if let Some(filter) = &self.log_filter {
            if filter.trim().is_empty() {
                return Err(Error::Config("log_filter must not be empty".to_string()));
            }
        }

        if !(self.playback.is_null() || self.playback.is_object()) {
            return Err(Error::Config(
                "playback section must be a JSON object".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the logging configuration described by this file.
    pub fn logging(&self) -> LoggingConfig {
        let config = LoggingConfig::default()
            .with_level(self.log_level)
            .with_format(self.log_format);

        match &self.log_filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

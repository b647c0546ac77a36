//! Configuration types for vd-agent
//!
//! The configuration is a single YAML document read once at startup:
//!
//! ```yaml
//! interval: 3600            # seconds between ticks
//! global_options:           # applied to every set
//!   format: bestaudio
//!   quiet: true
//! sets:
//!   - name: talks
//!     url: https://example.com/playlist
//!     options:
//!       quiet: false        # overrides the global value
//! engine:
//!   path: /usr/local/bin/yt-dlp
//! logging:
//!   level: info
//! dry_run: false
//! ```

use crate::error::{Error, Result};
use crate::options::Options;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path the configuration is read from when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "/app/config.yaml";

/// Longest accepted `interval`: one year, in seconds
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Main configuration for the agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Time between ticks, written as whole seconds
    #[serde(with = "duration_serde")]
    pub interval: Duration,

    /// Options applied to every set before its own overrides
    #[serde(default)]
    pub global_options: Options,

    /// Download sets, processed in the order they are declared
    pub sets: Vec<SetConfig>,

    /// Download engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulate downloads without writing any files (default: false)
    #[serde(default)]
    pub dry_run: bool,
}

/// One named download job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetConfig {
    /// Name used in log output
    pub name: String,

    /// Download target handed to the engine
    pub url: String,

    /// Options overriding the global options for this set only
    #[serde(default)]
    pub options: Options,
}

/// External engine settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Clear the engine cache before every set's download (default: true)
    #[serde(default = "default_true")]
    pub clear_cache: bool,

    /// Additional flags appended to every engine invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            search_path: true,
            clear_cache: true,
            extra_args: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level, overridden by `RUST_LOG` (default: info)
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-line engine chatter
    Trace,
    /// Engine debug output and command lines
    Debug,
    /// Phase markers and engine progress
    #[default]
    Info,
    /// Warnings and errors only
    #[serde(alias = "warning")]
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Config {
    /// Read, parse and validate the configuration file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, is not valid YAML,
    /// lacks a required key, or fails validation. All of these are fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a configuration document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed or invalid.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents).map_err(|e| Error::Config {
            message: format!("failed to parse configuration: {}", e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::config("interval", "must be at least 1 second"));
        }
        if self.interval.as_secs() > MAX_INTERVAL_SECS {
            return Err(Error::config(
                "interval",
                format!("must be at most {} seconds (one year)", MAX_INTERVAL_SECS),
            ));
        }

        let mut seen = HashSet::new();
        for (idx, set) in self.sets.iter().enumerate() {
            if set.name.trim().is_empty() {
                return Err(Error::config(
                    format!("sets[{}].name", idx),
                    "must not be empty",
                ));
            }
            if set.url.trim().is_empty() {
                return Err(Error::config(
                    format!("sets[{}].url", idx),
                    format!("set '{}' has an empty url", set.name),
                ));
            }
            if !seen.insert(set.name.as_str()) {
                tracing::warn!(set = %set.name, "duplicate set name in configuration");
            }
        }

        if self.sets.is_empty() {
            tracing::warn!("configuration contains no sets, every tick will be empty");
        }

        Ok(())
    }

    /// Render the configuration back to YAML for the startup dump
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config {
            message: format!("failed to render configuration: {}", e),
            key: None,
        })
    }
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

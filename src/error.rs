//! Error types for vd-agent
//!
//! Errors fall into two categories:
//! - **Fatal** errors happen during the one-time startup sequence (configuration,
//!   engine discovery, scheduler start) and terminate the process.
//! - **Recoverable** errors happen while a tick is running (engine failures). They
//!   abort the remainder of that tick only; the scheduler keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vd-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit code used when startup fails
pub const EXIT_FATAL: u8 = 1;

/// Process exit code used after a signal-triggered shutdown
pub const EXIT_SHUTDOWN: u8 = 0;

/// Main error type for vd-agent
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "sets[2].url")
        key: Option<String>,
    },

    /// The scheduler could not be started or could not register its job
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// No download engine binary could be located
    #[error("download engine not found: {0}")]
    EngineNotFound(String),

    /// Download engine failure while processing a set
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised by the external download engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine binary could not be executed
    #[error("failed to execute {}", .binary.display())]
    Spawn {
        /// Path of the binary that failed to start
        binary: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Clearing the engine cache exited unsuccessfully
    #[error("cache removal failed for set '{set}' (exit code {exit_code:?})")]
    CacheClear {
        /// Name of the set being processed
        set: String,
        /// Exit code of the engine process, if it exited normally
        exit_code: Option<i32>,
    },

    /// The download itself exited unsuccessfully
    #[error("download of {url} failed for set '{set}' (exit code {exit_code:?})")]
    Download {
        /// Name of the set being processed
        set: String,
        /// URL that was being downloaded
        url: String,
        /// Exit code of the engine process, if it exited normally
        exit_code: Option<i32>,
    },

    /// An option value cannot be passed to the engine
    #[error("option '{option}' has an unsupported value: {reason}")]
    InvalidOption {
        /// Option name as written in the configuration
        option: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Failure reported by a [`DownloadEngine`](crate::engine::DownloadEngine)
    /// implementation outside this crate
    ///
    /// The built-in yt-dlp engine never produces it. Custom engines use it for
    /// failures that match none of the variants above.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error belongs to the fatal startup category
    ///
    /// Fatal errors terminate the process; everything else only aborts the
    /// tick it occurred in.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::Scheduler(_) | Error::EngineNotFound(_)
        )
    }

    /// Machine-readable error code used as a log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Scheduler(_) => "scheduler_error",
            Error::EngineNotFound(_) => "engine_not_found",
            Error::Engine(EngineError::Spawn { .. }) => "engine_spawn_failed",
            Error::Engine(EngineError::CacheClear { .. }) => "cache_clear_failed",
            Error::Engine(EngineError::Download { .. }) => "download_failed",
            Error::Engine(EngineError::InvalidOption { .. }) => "invalid_option",
            Error::Engine(EngineError::Other(_)) => "engine_error",
            Error::Io(_) => "io_error",
        }
    }
}

/// Render an error together with its full `source()` chain
///
/// Used wherever an error is logged before being propagated, so the log
/// carries every cause and not only the outermost message.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut previous = rendered.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        // wrapping variants already embed their inner message
        if !previous.ends_with(&message) {
            rendered.push_str("\n  caused by: ");
            rendered.push_str(&message);
        }
        previous = message;
        source = cause.source();
    }
    rendered
}

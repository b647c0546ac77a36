//! Logging adapter handed to the download engine

use std::sync::Arc;

/// Indentation applied to every engine message so it nests under the
/// agent's own phase markers
const ENGINE_INDENT: &str = "    ";

/// Output stream an engine line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// Severity assigned to a line of engine output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    /// `[debug]` lines
    Debug,
    /// Regular progress output
    Info,
    /// `WARNING:` lines and unclassified stderr output
    Warning,
    /// `ERROR:` lines
    Error,
}

/// Routes engine messages through `tracing` with the set name attached
///
/// Exposes the `info`/`debug`/`warning`/`error` surface engines expect from
/// a logger. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EngineLogger {
    set: Arc<str>,
}

impl EngineLogger {
    /// Create a logger for the named set
    pub fn new(set: &str) -> Self {
        Self { set: Arc::from(set) }
    }

    /// Name of the set this logger reports for
    pub fn set_name(&self) -> &str {
        &self.set
    }

    /// Log an informational engine message
    pub fn info(&self, msg: &str) {
        tracing::info!(set = %self.set, "{ENGINE_INDENT}{msg}");
    }

    /// Log a debug engine message
    pub fn debug(&self, msg: &str) {
        tracing::debug!(set = %self.set, "{ENGINE_INDENT}{msg}");
    }

    /// Log an engine warning
    pub fn warning(&self, msg: &str) {
        tracing::warn!(set = %self.set, "{ENGINE_INDENT}{msg}");
    }

    /// Log an engine error
    pub fn error(&self, msg: &str) {
        tracing::error!(set = %self.set, "{ENGINE_INDENT}{msg}");
    }

    /// Log one line of raw engine output at the level its content implies
    pub fn log_line(&self, stream: Stream, line: &str) {
        match classify_line(stream, line) {
            LineLevel::Debug => self.debug(line),
            LineLevel::Info => self.info(line),
            LineLevel::Warning => self.warning(line),
            LineLevel::Error => self.error(line),
        }
    }
}

/// Decide the severity of a line of engine output
///
/// The engine prefixes its own diagnostics with `ERROR:`, `WARNING:` or
/// `[debug]`; anything else on stdout is progress, anything else on stderr is
/// treated as a warning.
pub fn classify_line(stream: Stream, line: &str) -> LineLevel {
    let trimmed = line.trim_start();
    if trimmed.starts_with("ERROR:") {
        LineLevel::Error
    } else if trimmed.starts_with("WARNING:") {
        LineLevel::Warning
    } else if trimmed.starts_with("[debug]") {
        LineLevel::Debug
    } else {
        match stream {
            Stream::Stdout => LineLevel::Info,
            Stream::Stderr => LineLevel::Warning,
        }
    }
}

//! Traits describing the external download engine

use crate::options::MergedOptions;
use async_trait::async_trait;

/// Factory for download sessions
///
/// One session is opened per set per tick and never shared. Implementations
/// can drive an external binary or, in tests, simply record what they were
/// asked to do.
///
/// # Examples
///
/// ```no_run
/// use vd_agent::engine::{CliEngine, DownloadEngine};
/// use vd_agent::config::SetConfig;
/// use vd_agent::options::{MergedOptions, Options};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = CliEngine::from_path().expect("yt-dlp not found in PATH");
/// let set = SetConfig {
///     name: "talks".into(),
///     url: "https://example.com/playlist".into(),
///     options: Options::new(),
/// };
///
/// let mut session = engine
///     .open_session(MergedOptions::for_set(&set, &Options::new()))
///     .await?;
/// session.remove_cache().await?;
/// session.download(&[set.url.clone()]).await?;
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Open a session configured with the merged options of one set
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be accepted by the engine.
    async fn open_session(&self, options: MergedOptions)
    -> crate::Result<Box<dyn EngineSession>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// A single engine session bound to one set's options
///
/// Callers must finish every session with [`EngineSession::close`], on
/// success and on failure alike.
#[async_trait]
pub trait EngineSession: Send {
    /// Remove any cached engine state for this session
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to clear its cache.
    async fn remove_cache(&mut self) -> crate::Result<()>;

    /// Download the given URLs
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not be run or reported failure.
    async fn download(&mut self, urls: &[String]) -> crate::Result<()>;

    /// Release the session and any resources it holds
    ///
    /// # Errors
    ///
    /// Returns an error if releasing resources failed.
    async fn close(self: Box<Self>) -> crate::Result<()>;
}

//! Per-set download invocation
//!
//! Each set gets a fresh engine session configured with its merged options.
//! The session clears the engine cache, downloads the set's URL and is then
//! released, whether or not the download succeeded.

use crate::engine::{DownloadEngine, EngineSession};
use crate::error::{Error, Result, error_chain};
use crate::options::MergedOptions;
use crate::output::print_separator;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs one set through the download engine
#[derive(Clone)]
pub struct DownloadInvoker {
    engine: Arc<dyn DownloadEngine>,
    clear_cache: bool,
}

impl DownloadInvoker {
    /// Create an invoker that clears the engine cache before each download
    pub fn new(engine: Arc<dyn DownloadEngine>) -> Self {
        Self {
            engine,
            clear_cache: true,
        }
    }

    /// Enable or disable the cache clear preceding each download
    pub fn with_cache_clearing(mut self, clear_cache: bool) -> Self {
        self.clear_cache = clear_cache;
        self
    }

    /// Download `url` with the given options
    ///
    /// The session is closed on every path. If both the download and the
    /// close fail, the close failure is logged and the download error wins.
    ///
    /// # Errors
    ///
    /// Returns the first engine error from opening the session, clearing the
    /// cache, downloading or closing the session.
    pub async fn invoke(&self, options: MergedOptions, url: &str) -> Result<()> {
        let set = options.set_name.clone();
        debug!(set = %set, engine = self.engine.name(), "creating engine session");

        let mut session = self
            .engine
            .open_session(options)
            .await
            .inspect_err(|e| log_failure(&set, "opening engine session", e))?;

        let outcome = self.drive(&set, session.as_mut(), url).await;
        let closed = session
            .close()
            .await
            .inspect_err(|e| log_failure(&set, "closing engine session", e));

        outcome?;
        closed?;
        info!("set complete!");
        Ok(())
    }

    async fn drive(&self, set: &str, session: &mut dyn EngineSession, url: &str) -> Result<()> {
        if self.clear_cache {
            info!("clearing yt-dlp cache");
            print_separator();
            session
                .remove_cache()
                .await
                .inspect_err(|e| log_failure(set, "clearing yt-dlp cache", e))?;
            print_separator();
        }

        info!("starting yt-dlp");
        print_separator();
        session
            .download(&[url.to_string()])
            .await
            .inspect_err(|e| log_failure(set, "running yt-dlp download", e))?;
        print_separator();
        Ok(())
    }
}

fn log_failure(set: &str, stage: &str, err: &Error) {
    error!(
        set = %set,
        code = err.error_code(),
        "error {}: {}",
        stage,
        error_chain(err)
    );
}

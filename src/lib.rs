//! # vd-agent
//!
//! Periodic batch download agent driving `yt-dlp`.
//!
//! The agent reads one YAML configuration at startup, then on a fixed interval
//! walks the configured download sets in order. Each set's options (global
//! defaults overlaid by per-set overrides) are handed to a fresh engine
//! session, which clears the engine cache and downloads the set's URL. A
//! failing set aborts the rest of that tick; the next tick starts over.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use vd_agent::{Agent, CliEngine, Config, run_until_signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("/app/config.yaml"))?;
//!     let engine = CliEngine::from_config(&config.engine, config.dry_run)?;
//!
//!     // Ticks until SIGHUP or SIGINT
//!     run_until_signal(Agent::new(config, Arc::new(engine))).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Agent lifecycle
pub mod agent;
/// Configuration types
pub mod config;
/// Per-tick set processing
pub mod dispatcher;
/// Download engine abstraction and the yt-dlp implementation
pub mod engine;
/// Error types
pub mod error;
/// Per-set download invocation
pub mod invoker;
/// Option maps and flag rendering
pub mod options;
/// Console separators and blocks
pub mod output;
/// Interval scheduler
pub mod scheduler;

mod scheduler_task;

pub use agent::Agent;
pub use config::{Config, EngineConfig, LogLevel, LoggingConfig, SetConfig};
pub use dispatcher::{SetDispatcher, TickReport};
pub use engine::{CliEngine, DownloadEngine, EngineSession};
pub use error::{EngineError, Error, Result};
pub use invoker::DownloadInvoker;
pub use options::{MergedOptions, Options};
pub use scheduler::{JobInfo, Scheduler, SchedulerHandle};

use tokio_util::sync::CancellationToken;

/// Run the agent until the process receives SIGHUP or SIGINT
///
/// # Errors
///
/// Returns the agent's startup error. A signal-triggered shutdown is `Ok`.
pub async fn run_until_signal(agent: Agent) -> Result<()> {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let listener = tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let result = agent.run(shutdown).await;
    listener.abort();
    result
}

/// Resolve once a shutdown signal arrives
///
/// - **Unix:** SIGHUP and SIGINT, falling back to whichever handler could be
///   registered.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::hangup()), signal(SignalKind::interrupt())) {
        (Ok(mut sighup), Ok(mut sigint)) => {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGHUP handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sighup), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGHUP only");
            sighup.recv().await;
            tracing::info!("Received SIGHUP signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            ctrl_c_received(tokio::signal::ctrl_c().await).await;
        }
    }
}

/// Resolve once a shutdown signal arrives
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c_received(tokio::signal::ctrl_c().await).await;
}

/// Resolve only if Ctrl+C actually arrived
///
/// A failed listener never resolves, so the agent keeps running instead of
/// shutting down right after startup.
async fn ctrl_c_received(outcome: std::io::Result<()>) {
    match outcome {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal, no shutdown signal will be received");
            std::future::pending::<()>().await;
        }
    }
}

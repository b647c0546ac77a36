//! Agent lifecycle: start the schedule, wait for shutdown, stop
//!
//! Startup failures are fatal and returned to the caller. Once the scheduler
//! runs, the agent only waits for the shutdown token.

use crate::config::Config;
use crate::dispatcher::SetDispatcher;
use crate::engine::DownloadEngine;
use crate::error::Result;
use crate::invoker::DownloadInvoker;
use crate::output::print_block;
use crate::scheduler::{DEFAULT_FIRST_RUN_DELAY, Scheduler, SchedulerHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The periodic download agent
pub struct Agent {
    config: Arc<Config>,
    engine: Arc<dyn DownloadEngine>,
    first_run_delay: Duration,
}

impl Agent {
    /// Create an agent for a loaded configuration
    pub fn new(config: Config, engine: Arc<dyn DownloadEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            first_run_delay: DEFAULT_FIRST_RUN_DELAY,
        }
    }

    /// Override the delay before the first tick
    pub fn with_first_run_delay(mut self, delay: Duration) -> Self {
        self.first_run_delay = delay;
        self
    }

    /// The configuration the agent runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Print the configuration and start the scheduler
    ///
    /// # Errors
    ///
    /// Returns a fatal error if the configuration cannot be rendered or the
    /// scheduler fails to start.
    pub fn start(&self) -> Result<SchedulerHandle> {
        info!("printing supplied configuration...");
        print_block("ALL OPTIONS:", &self.config.to_yaml()?);

        let invoker = DownloadInvoker::new(self.engine.clone())
            .with_cache_clearing(self.config.engine.clear_cache);
        let dispatcher = SetDispatcher::new(self.config.clone(), invoker);

        info!("adding main job");
        let handle = Scheduler::new(self.config.interval)
            .with_first_run_delay(self.first_run_delay)
            .start(Arc::new(dispatcher))?;
        handle.print_jobs();
        Ok(handle)
    }

    /// Run until `shutdown` is cancelled
    ///
    /// A tick in progress at shutdown is abandoned, and its engine process is
    /// killed.
    ///
    /// # Errors
    ///
    /// Returns the startup error if the scheduler could not be started.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let handle = self.start()?;

        info!("waiting for a shutdown signal...");
        shutdown.cancelled().await;

        info!("shutting down");
        handle.shutdown();
        handle.stopped().await;
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSession;
    use crate::options::MergedOptions;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEngine {
        sessions: AtomicUsize,
    }

    struct NoopSession;

    #[async_trait]
    impl DownloadEngine for CountingEngine {
        async fn open_session(&self, _options: MergedOptions) -> Result<Box<dyn EngineSession>> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NoopSession))
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[async_trait]
    impl EngineSession for NoopSession {
        async fn remove_cache(&mut self) -> Result<()> {
            Ok(())
        }

        async fn download(&mut self, _urls: &[String]) -> Result<()> {
            Ok(())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn config() -> Config {
        Config::from_yaml_str(
            "interval: 10\nsets:\n  - name: a\n    url: https://example.com/a\n",
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_after_shutdown_and_stops_ticking() {
        let engine = Arc::new(CountingEngine::default());
        let agent = Agent::new(config(), engine.clone());
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(agent.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(11_500)).await;
        assert_eq!(engine.sessions.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        task.await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(engine.sessions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_registers_the_dispatcher() {
        let agent = Agent::new(config(), Arc::new(CountingEngine::default()));

        let handle = agent.start().unwrap();

        let jobs = handle.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, crate::dispatcher::JOB_NAME);
        assert_eq!(jobs[0].interval, Duration::from_secs(10));
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_delay_is_configurable() {
        let engine = Arc::new(CountingEngine::default());
        let agent = Agent::new(config(), engine.clone()).with_first_run_delay(Duration::ZERO);

        let handle = agent.start().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(engine.sessions.load(Ordering::SeqCst), 1);
        assert_eq!(agent.config().sets.len(), 1);
        handle.shutdown();
    }
}

//! One tick of work: every configured set, in order
//!
//! The first failing set aborts the rest of the tick. The next tick starts
//! again from the first set.

use crate::config::Config;
use crate::error::Result;
use crate::invoker::DownloadInvoker;
use crate::options::MergedOptions;
use crate::scheduler::{Job, SchedulerHandle};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Name under which the dispatcher is registered with the scheduler
pub const JOB_NAME: &str = "set-dispatcher";

/// Outcome of a tick that processed every set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Names of the sets that were downloaded, in processing order
    pub completed: Vec<String>,
}

/// Walks the configured sets and hands each one to the invoker
#[derive(Clone)]
pub struct SetDispatcher {
    config: Arc<Config>,
    invoker: DownloadInvoker,
}

impl SetDispatcher {
    /// Create a dispatcher over `config`'s sets
    pub fn new(config: Arc<Config>, invoker: DownloadInvoker) -> Self {
        Self { config, invoker }
    }

    /// Process every set once
    ///
    /// # Errors
    ///
    /// Returns the error of the first set that failed. Sets after it are not
    /// attempted.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let mut report = TickReport::default();
        let total = self.config.sets.len();

        for (idx, set) in self.config.sets.iter().enumerate() {
            info!(set = %set.name, "starting set {}", set.name);
            let options = MergedOptions::for_set(set, &self.config.global_options);

            if let Err(e) = self.invoker.invoke(options, &set.url).await {
                let skipped = total - idx - 1;
                if skipped > 0 {
                    warn!(
                        set = %set.name,
                        skipped,
                        "aborting iteration, remaining sets will run on the next tick"
                    );
                }
                return Err(e);
            }
            report.completed.push(set.name.clone());
        }

        Ok(report)
    }
}

#[async_trait]
impl Job for SetDispatcher {
    fn name(&self) -> &str {
        JOB_NAME
    }

    async fn run(&self, scheduler: &SchedulerHandle) -> Result<()> {
        info!("running single iteration");
        let result = self.run_tick().await;
        info!("iteration complete!");
        scheduler.print_jobs();
        result.map(|report| {
            tracing::debug!(completed = report.completed.len(), "all sets processed");
        })
    }
}

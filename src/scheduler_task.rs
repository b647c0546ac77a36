//! Background task driving the scheduled job
//!
//! The task sleeps until the next interval boundary, runs the job inline, and
//! then works out the following boundary. Running inline is what keeps ticks
//! from overlapping: boundaries that passed while the job was still running
//! are counted as skipped instead of being queued.

use crate::error::error_chain;
use crate::scheduler::{Job, SchedulerHandle};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::DropGuard;
use tracing::{debug, error, info, warn};

/// Scheduler task that runs one job at a fixed interval
pub(crate) struct SchedulerTask {
    job: Arc<dyn Job>,
    handle: SchedulerHandle,
    interval: Duration,
    first_run_delay: Duration,
    /// Marks the scheduler as stopped when the task ends or is dropped
    _stopped: DropGuard,
}

impl SchedulerTask {
    /// Creates a new scheduler task
    pub(crate) fn new(
        job: Arc<dyn Job>,
        handle: SchedulerHandle,
        interval: Duration,
        first_run_delay: Duration,
    ) -> Self {
        let stopped = handle.stopped.clone().drop_guard();
        Self {
            job,
            handle,
            interval,
            first_run_delay,
            _stopped: stopped,
        }
    }

    /// Runs until the handle is shut down
    pub(crate) async fn run(self) {
        let name = self.handle.state.name().to_string();
        let cancel = self.handle.cancel.clone();
        let Some(mut next) = Instant::now().checked_add(self.first_run_delay) else {
            error!(job = %name, "first run time is out of range, scheduler not started");
            self.handle.state.mark_stopped();
            return;
        };

        info!(job = %name, "scheduler task started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep_until(next) => {}
            }

            // the current run still happens when the following boundary is out of range
            let upcoming = self.advance(&name, next);
            match upcoming {
                Some(at) => self
                    .handle
                    .state
                    .set_next_run_in(at.saturating_duration_since(Instant::now())),
                None => self.handle.state.clear_next_run(),
            }
            self.handle.state.begin_run();

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job = %name, "scheduler stopped while a run was in progress");
                    break;
                }
                outcome = AssertUnwindSafe(self.job.run(&self.handle)).catch_unwind() => outcome,
            };

            match outcome {
                Ok(Ok(())) => {
                    self.handle.state.finish_run(true);
                    debug!(job = %name, "scheduled run finished");
                }
                Ok(Err(e)) => {
                    self.handle.state.finish_run(false);
                    error!(
                        job = %name,
                        error = %error_chain(&e),
                        code = e.error_code(),
                        "scheduled run aborted, next run stays on schedule"
                    );
                }
                Err(_) => {
                    self.handle.state.finish_run(false);
                    error!(job = %name, "scheduled run panicked, next run stays on schedule");
                }
            }

            let Some(mut following) = upcoming else {
                break;
            };
            let now = Instant::now();
            let mut skipped = 0u64;
            while following < now {
                match self.advance(&name, following) {
                    Some(at) => following = at,
                    None => break,
                }
                skipped += 1;
            }
            if following < now {
                break;
            }
            next = following;
            if skipped > 0 {
                self.handle.state.add_skipped(skipped);
                warn!(
                    job = %name,
                    skipped,
                    "run took longer than the interval, skipping missed runs"
                );
            }
            self.handle
                .state
                .set_next_run_in(next.saturating_duration_since(now));
        }

        self.handle.state.mark_stopped();
        info!(job = %name, "scheduler task stopped");
    }

    /// The boundary one interval after `next`, or None past the clock's range
    fn advance(&self, name: &str, next: Instant) -> Option<Instant> {
        let following = next.checked_add(self.interval);
        if following.is_none() {
            error!(job = %name, "next run time is out of range, stopping the schedule");
        }
        following
    }
}

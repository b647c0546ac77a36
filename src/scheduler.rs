//! Interval scheduling of the recurring download job
//!
//! A [`Scheduler`] runs exactly one [`Job`] on a background task: the first
//! run happens shortly after start (one second by default), later runs every
//! `interval`. Runs never overlap. Interval boundaries that pass while a run
//! is still in progress are skipped and counted, and the next run waits for
//! the following boundary.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use vd_agent::scheduler::{Job, Scheduler, SchedulerHandle};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Job for Hello {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     async fn run(&self, scheduler: &SchedulerHandle) -> vd_agent::Result<()> {
//!         scheduler.print_jobs();
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> vd_agent::Result<()> {
//! let handle = Scheduler::new(Duration::from_secs(60)).start(Arc::new(Hello))?;
//! handle.print_jobs();
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::output::print_block;
use crate::scheduler_task::SchedulerTask;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay before the first run after the scheduler starts
pub const DEFAULT_FIRST_RUN_DELAY: Duration = Duration::from_secs(1);

/// Work executed on every tick
#[async_trait]
pub trait Job: Send + Sync {
    /// Name shown in job diagnostics
    fn name(&self) -> &str;

    /// Execute one tick
    ///
    /// The handle of the scheduler running this job is passed in so the job
    /// can report scheduler diagnostics.
    ///
    /// # Errors
    ///
    /// An error aborts only this tick. The scheduler logs it and keeps the
    /// schedule.
    async fn run(&self, scheduler: &SchedulerHandle) -> Result<()>;
}

/// Builder for the background scheduler
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    first_run_delay: Duration,
}

impl Scheduler {
    /// Create a scheduler running its job every `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            first_run_delay: DEFAULT_FIRST_RUN_DELAY,
        }
    }

    /// Override the delay before the first run
    pub fn with_first_run_delay(mut self, delay: Duration) -> Self {
        self.first_run_delay = delay;
        self
    }

    /// Register `job` and start ticking on a background task
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scheduler`] if the interval is zero, no runtime is
    /// available, or the first runs fall outside the clock's range.
    pub fn start(self, job: Arc<dyn Job>) -> Result<SchedulerHandle> {
        if self.interval.is_zero() {
            return Err(Error::Scheduler(
                "interval must be greater than zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Scheduler(format!("no async runtime available: {}", e)))?;
        let now = tokio::time::Instant::now();
        if now
            .checked_add(self.first_run_delay)
            .and_then(|first| first.checked_add(self.interval))
            .is_none()
        {
            return Err(Error::Scheduler(format!(
                "interval {:?} with first run delay {:?} is out of range",
                self.interval, self.first_run_delay
            )));
        }

        let handle = SchedulerHandle {
            state: Arc::new(JobState::new(job.name(), self.interval)),
            cancel: CancellationToken::new(),
            stopped: CancellationToken::new(),
        };

        handle.state.set_next_run_in(self.first_run_delay);

        tracing::info!(
            job = %job.name(),
            interval_secs = self.interval.as_secs(),
            first_run_in = ?self.first_run_delay,
            "adding scheduled job"
        );

        let task = SchedulerTask::new(job, handle.clone(), self.interval, self.first_run_delay);
        runtime.spawn(task.run());

        Ok(handle)
    }
}

/// Snapshot of the scheduled job
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    /// Job name
    pub name: String,
    /// Time between runs
    pub interval: Duration,
    /// Wall-clock time of the next run (None once the scheduler stopped)
    pub next_run: Option<DateTime<Local>>,
    /// Whether a run is in progress
    pub running: bool,
    /// Runs that finished successfully
    pub completed_runs: u64,
    /// Runs that returned an error or panicked
    pub failed_runs: u64,
    /// Interval boundaries skipped because a run was still in progress
    pub skipped_runs: u64,
}

impl fmt::Display for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (trigger: interval[{}s], ", self.name, self.interval.as_secs())?;
        match &self.next_run {
            Some(at) => write!(f, "next run at: {}", at.format("%Y-%m-%d %H:%M:%S %Z"))?,
            None => write!(f, "stopped")?,
        }
        write!(
            f,
            ", running: {}, completed: {}, failed: {}, skipped: {})",
            self.running, self.completed_runs, self.failed_runs, self.skipped_runs
        )
    }
}

/// Live state of the scheduled job, shared between the task and its handles
#[derive(Debug)]
pub(crate) struct JobState {
    name: String,
    interval: Duration,
    next_run: Mutex<Option<DateTime<Local>>>,
    running: AtomicBool,
    completed_runs: AtomicU64,
    failed_runs: AtomicU64,
    skipped_runs: AtomicU64,
}

impl JobState {
    fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval,
            next_run: Mutex::new(None),
            running: AtomicBool::new(false),
            completed_runs: AtomicU64::new(0),
            failed_runs: AtomicU64::new(0),
            skipped_runs: AtomicU64::new(0),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_next_run_in(&self, delay: Duration) {
        // out-of-range times are reported as "no next run" rather than panicking
        let at = TimeDelta::from_std(delay)
            .ok()
            .and_then(|d| Local::now().checked_add_signed(d));
        *self.next_run.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub(crate) fn clear_next_run(&self) {
        *self.next_run.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn begin_run(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn finish_run(&self, succeeded: bool) {
        self.running.store(false, Ordering::SeqCst);
        let counter = if succeeded {
            &self.completed_runs
        } else {
            &self.failed_runs
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_skipped(&self, count: u64) {
        self.skipped_runs.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn mark_stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.clear_next_run();
    }

    fn snapshot(&self) -> JobInfo {
        JobInfo {
            name: self.name.clone(),
            interval: self.interval,
            next_run: *self.next_run.lock().unwrap_or_else(PoisonError::into_inner),
            running: self.running.load(Ordering::SeqCst),
            completed_runs: self.completed_runs.load(Ordering::SeqCst),
            failed_runs: self.failed_runs.load(Ordering::SeqCst),
            skipped_runs: self.skipped_runs.load(Ordering::SeqCst),
        }
    }
}

/// Handle to a started scheduler
///
/// Cheap to clone. Dropping every handle does not stop the scheduler; call
/// [`SchedulerHandle::shutdown`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    pub(crate) state: Arc<JobState>,
    pub(crate) cancel: CancellationToken,
    pub(crate) stopped: CancellationToken,
}

impl SchedulerHandle {
    /// Current scheduled jobs
    pub fn jobs(&self) -> Vec<JobInfo> {
        if self.is_running() {
            vec![self.state.snapshot()]
        } else {
            Vec::new()
        }
    }

    /// Log the current scheduled jobs between separators
    pub fn print_jobs(&self) {
        let jobs = self.jobs();
        let body = if jobs.is_empty() {
            "no scheduled jobs".to_string()
        } else {
            jobs.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        };
        print_block("jobs info:", &body);
    }

    /// Stop ticking
    ///
    /// A run in progress is dropped, not drained.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the scheduler task is still alive
    pub fn is_running(&self) -> bool {
        !self.stopped.is_cancelled()
    }

    /// Wait until the scheduler task has exited
    pub async fn stopped(&self) {
        self.stopped.cancelled().await;
    }
}

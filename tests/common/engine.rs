//! Recording mock of the download engine

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vd_agent::{DownloadEngine, EngineError, EngineSession, MergedOptions, Options, Result};

/// One call observed by the engine, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open { set: String, options: Options },
    RemoveCache { set: String },
    Download { set: String, urls: Vec<String> },
    Close { set: String },
}

/// Engine that records every call and fails downloads of chosen sets
#[derive(Default)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<Call>>>,
    failing: HashSet<String>,
    download_time: Duration,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Downloads of the named sets exit with an error
    pub fn failing(sets: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: sets.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        })
    }

    /// Every download takes `duration` of (tokio) time
    pub fn slow(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            download_time: duration,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Set names in download order
    pub fn downloaded_sets(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Download { set, .. } => Some(set),
                _ => None,
            })
            .collect()
    }

    /// Options each session was opened with, keyed by set name in call order
    pub fn opened_with(&self) -> Vec<(String, Options)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Open { set, options } => Some((set, options)),
                _ => None,
            })
            .collect()
    }
}

struct RecordingSession {
    calls: Arc<Mutex<Vec<Call>>>,
    set: String,
    fail: bool,
    download_time: Duration,
}

impl RecordingSession {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DownloadEngine for RecordingEngine {
    async fn open_session(&self, options: MergedOptions) -> Result<Box<dyn EngineSession>> {
        self.calls.lock().unwrap().push(Call::Open {
            set: options.set_name.clone(),
            options: options.options.clone(),
        });
        Ok(Box::new(RecordingSession {
            calls: self.calls.clone(),
            fail: self.failing.contains(&options.set_name),
            set: options.set_name,
            download_time: self.download_time,
        }))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[async_trait]
impl EngineSession for RecordingSession {
    async fn remove_cache(&mut self) -> Result<()> {
        self.record(Call::RemoveCache {
            set: self.set.clone(),
        });
        Ok(())
    }

    async fn download(&mut self, urls: &[String]) -> Result<()> {
        self.record(Call::Download {
            set: self.set.clone(),
            urls: urls.to_vec(),
        });
        if !self.download_time.is_zero() {
            tokio::time::sleep(self.download_time).await;
        }
        if self.fail {
            return Err(EngineError::Download {
                set: self.set.clone(),
                url: urls.join(" "),
                exit_code: Some(1),
            }
            .into());
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.record(Call::Close {
            set: self.set.clone(),
        });
        Ok(())
    }
}

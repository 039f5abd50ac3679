//! Polls a single job until it reaches a terminal status.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::JobsApi;
use crate::error::ErrorInfo;
use crate::models::Job;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Latest state seen by a [`JobWatcher`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchSnapshot {
    /// Last successfully fetched job.
    pub job: Option<Job>,
    /// Error from the most recent poll, cleared by the next success.
    pub error: Option<ErrorInfo>,
    pub polls: u32,
    /// No further polls will happen.
    pub finished: bool,
}

pub struct JobWatcher {
    job_id: String,
    state: watch::Receiver<WatchSnapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl JobWatcher {
    /// Starts polling `job_id` every `interval`. The first fetch is immediate.
    ///
    /// Polling stops once the job is finished, on a non-retryable error, or
    /// when the watcher is stopped or dropped.
    pub fn spawn(api: Arc<dyn JobsApi>, job_id: &str, interval: Duration) -> Self {
        let (state_tx, state) = watch::channel(WatchSnapshot::default());
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let id = job_id.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        log::debug!("Stopped watching job {}", id);
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let result = api.get_job(&id).await;
                let done = match &result {
                    Ok(job) => job.is_finished(),
                    Err(e) => {
                        log::warn!("Polling job {} failed: {}", id, e);
                        !e.is_retryable()
                    }
                };

                state_tx.send_modify(|snapshot| {
                    snapshot.polls += 1;
                    match result {
                        Ok(job) => {
                            snapshot.job = Some(job);
                            snapshot.error = None;
                        }
                        Err(e) => snapshot.error = Some(ErrorInfo::from(&e)),
                    }
                    snapshot.finished = done;
                });

                if done {
                    log::info!("Job {} settled, watch finished", id);
                    break;
                }
            }

            state_tx.send_if_modified(|snapshot| !std::mem::replace(&mut snapshot.finished, true));
        });

        Self {
            job_id: job_id.to_string(),
            state,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn snapshot(&self) -> WatchSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified after every poll.
    pub fn subscribe(&self) -> watch::Receiver<WatchSnapshot> {
        self.state.clone()
    }

    /// Asks the poll loop to exit after the current fetch.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Waits for polling to end and returns the final snapshot.
    pub async fn finished(mut self) -> WatchSnapshot {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Watcher for job {} ended abnormally: {}", self.job_id, e);
            }
        }
        self.snapshot()
    }
}

impl Drop for JobWatcher {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

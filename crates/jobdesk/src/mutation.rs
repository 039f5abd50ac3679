//! Mutation dispatcher.
//!
//! Runs create/start/cancel/retry/delete against the API. Each in-flight
//! operation is tracked under its own [`MutationKey`], every outcome is
//! reported through the [`Notifier`], and once an operation settles the jobs
//! list is refetched. Job values are never patched locally.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::api::JobsApi;
use crate::error::{error_message, ApiError};
use crate::models::{CreateJobForm, CreateJobRequest, Job, JobPage};
use crate::notify::{Notification, Notifier};
use crate::query::JobQueryParams;
use crate::resource::ResourceQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Start,
    Cancel,
    Retry,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Start => "start",
            MutationKind::Cancel => "cancel",
            MutationKind::Retry => "retry",
            MutationKind::Delete => "delete",
        }
    }

    fn success_title(&self) -> &'static str {
        match self {
            MutationKind::Create => "Job created",
            MutationKind::Start => "Job started",
            MutationKind::Cancel => "Job cancelled",
            MutationKind::Retry => "Job retried",
            MutationKind::Delete => "Job deleted",
        }
    }

    fn failure_title(&self) -> &'static str {
        match self {
            MutationKind::Create => "Failed to create job",
            MutationKind::Start => "Failed to start job",
            MutationKind::Cancel => "Failed to cancel job",
            MutationKind::Retry => "Failed to retry job",
            MutationKind::Delete => "Failed to delete job",
        }
    }

    fn success_message(&self, label: &str) -> String {
        match self {
            MutationKind::Create => "New job has been created successfully.".to_string(),
            MutationKind::Start => format!("Job \"{}\" has been started successfully.", label),
            MutationKind::Cancel => format!("Job \"{}\" has been cancelled.", label),
            MutationKind::Retry => format!("Job \"{}\" has been restarted.", label),
            MutationKind::Delete => format!("Job \"{}\" has been deleted successfully.", label),
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one in-flight operation. Create has no job id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationKey {
    pub kind: MutationKind,
    pub job_id: Option<String>,
}

impl MutationKey {
    pub fn new(kind: MutationKind, job_id: Option<&str>) -> Self {
        Self {
            kind,
            job_id: job_id.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    Succeeded(T),
    Failed(ApiError),
    /// The user declined the confirmation; nothing was dispatched.
    Declined,
}

impl<T> MutationOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationOutcome::Succeeded(_))
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            MutationOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Blocking confirmation asked before destructive operations.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Confirms everything, for non-interactive callers that already asked.
pub struct AssumeYes;

#[async_trait]
impl ConfirmPrompt for AssumeYes {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}

type PendingMap = HashMap<MutationKey, usize>;

/// Marks a key pending until dropped.
struct PendingGuard {
    pending: Arc<Mutex<PendingMap>>,
    key: MutationKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = lock_pending(&self.pending);
        if let Some(count) = pending.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                pending.remove(&self.key);
            }
        }
    }
}

fn lock_pending(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Pending mutations lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[derive(Clone)]
pub struct MutationDispatcher {
    api: Arc<dyn JobsApi>,
    jobs: ResourceQuery<JobQueryParams, JobPage>,
    notifier: Notifier,
    pending: Arc<Mutex<PendingMap>>,
}

impl MutationDispatcher {
    pub fn new(
        api: Arc<dyn JobsApi>,
        jobs: ResourceQuery<JobQueryParams, JobPage>,
        notifier: Notifier,
    ) -> Self {
        Self {
            api,
            jobs,
            notifier,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_pending(&self, kind: MutationKind, job_id: Option<&str>) -> bool {
        lock_pending(&self.pending).contains_key(&MutationKey::new(kind, job_id))
    }

    /// True if any operation of `kind` is in flight, whatever its job.
    pub fn is_kind_pending(&self, kind: MutationKind) -> bool {
        lock_pending(&self.pending).keys().any(|key| key.kind == kind)
    }

    pub fn pending_keys(&self) -> Vec<MutationKey> {
        lock_pending(&self.pending).keys().cloned().collect()
    }

    pub async fn start(&self, job: &Job) -> MutationOutcome<Option<Job>> {
        let api = Arc::clone(&self.api);
        let id = job.id.clone();
        self.run(MutationKind::Start, Some(job), async move {
            api.start_job(&id).await
        })
        .await
    }

    pub async fn cancel(&self, job: &Job) -> MutationOutcome<Option<Job>> {
        let api = Arc::clone(&self.api);
        let id = job.id.clone();
        self.run(MutationKind::Cancel, Some(job), async move {
            api.cancel_job(&id).await
        })
        .await
    }

    pub async fn retry(&self, job: &Job) -> MutationOutcome<Option<Job>> {
        let api = Arc::clone(&self.api);
        let id = job.id.clone();
        self.run(MutationKind::Retry, Some(job), async move {
            api.retry_job(&id).await
        })
        .await
    }

    /// Deletes `job` once `prompt` confirms. Declining dispatches nothing.
    pub async fn delete(&self, job: &Job, prompt: &dyn ConfirmPrompt) -> MutationOutcome<()> {
        let question = format!("Are you sure you want to delete job \"{}\"?", job.label());
        if !prompt.confirm(&question).await {
            log::info!("Deletion of job {} declined", job.id);
            return MutationOutcome::Declined;
        }

        let api = Arc::clone(&self.api);
        let id = job.id.clone();
        self.run(MutationKind::Delete, Some(job), async move {
            api.delete_job(&id).await
        })
        .await
    }

    pub async fn create(&self, request: CreateJobRequest) -> MutationOutcome<Job> {
        let api = Arc::clone(&self.api);
        self.run(MutationKind::Create, None, async move {
            api.create_job(&request).await
        })
        .await
    }

    /// Validates the dialog form, then creates the job.
    ///
    /// A form that fails validation is reported like any other create failure.
    pub async fn create_from_form(&self, form: CreateJobForm) -> MutationOutcome<Job> {
        match form.into_request() {
            Ok(request) => self.create(request).await,
            Err(e) => {
                let error = ApiError::from(e);
                self.notifier.send(Notification::error(
                    MutationKind::Create.failure_title(),
                    error_message(&error),
                ));
                MutationOutcome::Failed(error)
            }
        }
    }

    async fn run<T, Fut>(
        &self,
        kind: MutationKind,
        job: Option<&Job>,
        call: Fut,
    ) -> MutationOutcome<T>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let key = MutationKey::new(kind, job.map(|j| j.id.as_str()));
        let guard = self.mark_pending(key);
        log::info!(
            "Dispatching {} for {}",
            kind,
            job.map(|j| j.id.as_str()).unwrap_or("new job")
        );

        let result = call.await;
        drop(guard);

        let outcome = match result {
            Ok(value) => {
                let label = job.map(Job::label).unwrap_or_default();
                let mut notification =
                    Notification::success(kind.success_title(), kind.success_message(label));
                if let Some(job) = job {
                    notification = notification.for_job(&job.id);
                }
                self.notifier.send(notification);
                MutationOutcome::Succeeded(value)
            }
            Err(error) => {
                log::error!("{} failed: {}", kind, error);
                let mut notification =
                    Notification::error(kind.failure_title(), error_message(&error));
                if let Some(job) = job {
                    notification = notification.for_job(&job.id);
                }
                self.notifier.send(notification);
                MutationOutcome::Failed(error)
            }
        };

        self.refresh_after_settle().await;
        outcome
    }

    fn mark_pending(&self, key: MutationKey) -> PendingGuard {
        *lock_pending(&self.pending).entry(key.clone()).or_insert(0) += 1;
        PendingGuard {
            pending: Arc::clone(&self.pending),
            key,
        }
    }

    async fn refresh_after_settle(&self) {
        self.jobs.invalidate();
        if let Some(handle) = self.jobs.refetch() {
            if let Err(e) = handle.await {
                log::warn!("Refetch after mutation did not complete: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_text() {
        assert_eq!(
            MutationKind::Start.success_message("Invoices"),
            "Job \"Invoices\" has been started successfully."
        );
        assert_eq!(
            MutationKind::Retry.success_message("j-1"),
            "Job \"j-1\" has been restarted."
        );
        assert_eq!(MutationKind::Delete.failure_title(), "Failed to delete job");
        assert_eq!(
            MutationKind::Create.success_message(""),
            "New job has been created successfully."
        );
    }

    #[test]
    fn test_mutation_keys_are_per_job() {
        let start_a = MutationKey::new(MutationKind::Start, Some("a"));
        let start_b = MutationKey::new(MutationKind::Start, Some("b"));
        let cancel_a = MutationKey::new(MutationKind::Cancel, Some("a"));
        assert_ne!(start_a, start_b);
        assert_ne!(start_a, cancel_a);
        assert_eq!(start_a, MutationKey::new(MutationKind::Start, Some("a")));
    }

    #[tokio::test]
    async fn test_assume_yes() {
        assert!(AssumeYes.confirm("Delete?").await);
    }
}

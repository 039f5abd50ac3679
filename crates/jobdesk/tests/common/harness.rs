//! Scripted in-memory API and controller harness.
//!
//! `ScriptedApi` records every call and answers from scripted replies. A reply
//! can be gated so the test decides when the in-flight request resolves.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use jobdesk::controller::{ControllerOptions, JobsController};
use jobdesk::error::ApiError;
use jobdesk::models::{CreateJobRequest, Job, JobPage, Page, Project, ProjectPage};
use jobdesk::query::{JobQueryParams, MemoryLocation};
use jobdesk::resource::QueryOptions;
use jobdesk::JobsApi;

/// A recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListJobs(JobQueryParams),
    GetJob(String),
    CreateJob(CreateJobRequest),
    StartJob(String),
    CancelJob(String),
    RetryJob(String),
    DeleteJob(String),
    ListProjects(u32),
}

/// Releases a gated reply. Dropping it releases the reply too.
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

struct Reply<T> {
    result: Result<T, ApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

impl<T> Reply<T> {
    fn now(result: Result<T, ApiError>) -> Self {
        Self { result, gate: None }
    }

    fn gated(result: Result<T, ApiError>) -> (Self, Gate) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                result,
                gate: Some(rx),
            },
            Gate(tx),
        )
    }

    async fn resolve(self) -> Result<T, ApiError> {
        if let Some(gate) = self.gate {
            let _ = gate.await;
        }
        self.result
    }
}

type ListMatcher = Box<dyn Fn(&JobQueryParams) -> bool + Send + Sync>;

/// Job actions that can be scripted per job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Start,
    Cancel,
    Retry,
    Delete,
}

#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<Call>>,
    default_page: Mutex<JobPage>,
    list_replies: Mutex<Vec<(ListMatcher, Reply<JobPage>)>>,
    action_replies: Mutex<HashMap<(Action, String), VecDeque<Reply<Option<Job>>>>>,
    create_replies: Mutex<VecDeque<Reply<Job>>>,
    jobs_by_id: Mutex<HashMap<String, Job>>,
    projects: Mutex<Vec<Project>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_jobs(jobs: Vec<Job>) -> Arc<Self> {
        let api = Self::new();
        api.set_page(jobs);
        api
    }

    /// Page returned by `list_jobs` when no scripted reply matches.
    pub fn set_page(&self, jobs: Vec<Job>) {
        let total = jobs.len() as u64;
        self.set_page_with_total(jobs, total);
    }

    pub fn set_page_with_total(&self, jobs: Vec<Job>, total: u64) {
        let mut by_id = self.jobs_by_id.lock().unwrap();
        for job in &jobs {
            by_id.insert(job.id.clone(), job.clone());
        }
        *self.default_page.lock().unwrap() = Page::new(jobs, total);
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        *self.projects.lock().unwrap() = projects;
    }

    /// Answers the next list request matching `matcher`.
    pub fn reply_list(
        &self,
        matcher: impl Fn(&JobQueryParams) -> bool + Send + Sync + 'static,
        result: Result<JobPage, ApiError>,
    ) {
        self.list_replies
            .lock()
            .unwrap()
            .push((Box::new(matcher), Reply::now(result)));
    }

    /// Like [`Self::reply_list`], but held until the returned gate opens.
    pub fn gate_list(
        &self,
        matcher: impl Fn(&JobQueryParams) -> bool + Send + Sync + 'static,
        result: Result<JobPage, ApiError>,
    ) -> Gate {
        let (reply, gate) = Reply::gated(result);
        self.list_replies
            .lock()
            .unwrap()
            .push((Box::new(matcher), reply));
        gate
    }

    pub fn reply_action(&self, action: Action, id: &str, result: Result<Option<Job>, ApiError>) {
        self.push_action(action, id, Reply::now(result));
    }

    pub fn gate_action(
        &self,
        action: Action,
        id: &str,
        result: Result<Option<Job>, ApiError>,
    ) -> Gate {
        let (reply, gate) = Reply::gated(result);
        self.push_action(action, id, reply);
        gate
    }

    pub fn reply_create(&self, result: Result<Job, ApiError>) {
        self.create_replies
            .lock()
            .unwrap()
            .push_back(Reply::now(result));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<JobQueryParams> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ListJobs(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    pub fn last_list_call(&self) -> Option<JobQueryParams> {
        self.list_calls().pop()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn push_action(&self, action: Action, id: &str, reply: Reply<Option<Job>>) {
        self.action_replies
            .lock()
            .unwrap()
            .entry((action, id.to_string()))
            .or_default()
            .push_back(reply);
    }

    fn take_action(&self, action: Action, id: &str) -> Reply<Option<Job>> {
        self.action_replies
            .lock()
            .unwrap()
            .get_mut(&(action, id.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::now(Ok(None)))
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::Status {
            status: 404,
            code: "NOT_FOUND".to_string(),
            message: format!("Job {} not found", id),
            request_id: None,
        }
    }
}

#[async_trait]
impl JobsApi for ScriptedApi {
    async fn list_jobs(&self, params: &JobQueryParams) -> Result<JobPage, ApiError> {
        self.record(Call::ListJobs(params.clone()));
        let reply = {
            let mut replies = self.list_replies.lock().unwrap();
            match replies.iter().position(|(matcher, _)| matcher(params)) {
                Some(idx) => replies.remove(idx).1,
                None => Reply::now(Ok(self.default_page.lock().unwrap().clone())),
            }
        };
        reply.resolve().await
    }

    async fn get_job(&self, id: &str) -> Result<Job, ApiError> {
        self.record(Call::GetJob(id.to_string()));
        let job = self.jobs_by_id.lock().unwrap().get(id).cloned();
        job.ok_or_else(|| Self::not_found(id))
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError> {
        self.record(Call::CreateJob(request.clone()));
        let reply = self.create_replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(ApiError::Network("no scripted create reply".to_string())),
        }
    }

    async fn start_job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        self.record(Call::StartJob(id.to_string()));
        let reply = self.take_action(Action::Start, id);
        reply.resolve().await
    }

    async fn cancel_job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        self.record(Call::CancelJob(id.to_string()));
        let reply = self.take_action(Action::Cancel, id);
        reply.resolve().await
    }

    async fn retry_job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        self.record(Call::RetryJob(id.to_string()));
        let reply = self.take_action(Action::Retry, id);
        reply.resolve().await
    }

    async fn delete_job(&self, id: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteJob(id.to_string()));
        let reply = self.take_action(Action::Delete, id);
        reply.resolve().await.map(|_| ())
    }

    async fn list_projects(&self, limit: u32) -> Result<ProjectPage, ApiError> {
        self.record(Call::ListProjects(limit));
        let projects = self.projects.lock().unwrap().clone();
        let total = projects.len() as u64;
        Ok(Page::new(projects, total))
    }
}

/// Options without caching or query retries, so every fetch reaches the API once.
pub fn test_options() -> ControllerOptions {
    ControllerOptions {
        query: QueryOptions {
            stale_time: Duration::ZERO,
            retries: 0,
        },
        ..ControllerOptions::default()
    }
}

/// A controller wired to a [`ScriptedApi`] and a [`MemoryLocation`].
pub struct TestHarness {
    pub api: Arc<ScriptedApi>,
    pub location: Arc<MemoryLocation>,
    pub controller: JobsController,
}

impl TestHarness {
    pub fn new(api: Arc<ScriptedApi>, query: &str) -> Self {
        Self::with_options(api, query, test_options())
    }

    pub fn with_options(api: Arc<ScriptedApi>, query: &str, options: ControllerOptions) -> Self {
        let location = Arc::new(MemoryLocation::from_query(query));
        let controller = JobsController::new(api.clone(), location.clone(), options);
        Self {
            api,
            location,
            controller,
        }
    }

    /// Mounts the controller and waits for the first page.
    pub async fn mount(&mut self) {
        let handle = self.controller.mount();
        settle(handle).await;
    }

    pub fn query_string(&self) -> String {
        use jobdesk::LocationStore;
        self.location.read().to_string()
    }
}

/// Awaits a fetch handle, if one was started.
pub async fn settle(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.await.expect("fetch task panicked");
    }
}

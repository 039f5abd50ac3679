//! Access to the jobs REST API.
//!
//! [`JobsApi`] is the seam between the controller and the network; the
//! controller only ever talks to a `dyn JobsApi`, so tests can swap in a
//! scripted implementation.

pub mod http;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{CreateJobRequest, Job, JobPage, ProjectPage};
use crate::query::JobQueryParams;

pub use http::HttpJobsApi;

#[async_trait]
pub trait JobsApi: Send + Sync {
    /// Lists one page of jobs. Idempotent.
    async fn list_jobs(&self, params: &JobQueryParams) -> Result<JobPage, ApiError>;

    async fn get_job(&self, id: &str) -> Result<Job, ApiError>;

    async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError>;

    /// Returns the updated job, or `None` when the server only acknowledged.
    async fn start_job(&self, id: &str) -> Result<Option<Job>, ApiError>;

    async fn cancel_job(&self, id: &str) -> Result<Option<Job>, ApiError>;

    async fn retry_job(&self, id: &str) -> Result<Option<Job>, ApiError>;

    async fn delete_job(&self, id: &str) -> Result<(), ApiError>;

    async fn list_projects(&self, limit: u32) -> Result<ProjectPage, ApiError>;
}

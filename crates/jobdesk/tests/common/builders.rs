//! Builders for jobs, pages and API errors.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};

use jobdesk::error::ApiError;
use jobdesk::models::{Job, JobPage, JobStatus, JobType, Page, Project};

/// Builder for `Job` values.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    /// A pending parse job with no name or project.
    pub fn new(id: &str) -> Self {
        Self {
            job: Job {
                id: id.to_string(),
                name: None,
                job_type: JobType::Parse,
                status: JobStatus::Pending,
                progress: 0,
                duration: None,
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
                project: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.job.name = Some(name.to_string());
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.job.job_type = job_type;
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.job.progress = progress;
        self
    }

    pub fn project(mut self, id: &str, name: &str) -> Self {
        self.job.project = Some(project(id, name));
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

pub fn job(id: &str, status: JobStatus) -> Job {
    JobBuilder::new(id).status(status).build()
}

/// Pending jobs with the given ids.
pub fn jobs(ids: &[&str]) -> Vec<Job> {
    ids.iter().map(|id| job(id, JobStatus::Pending)).collect()
}

pub fn page(jobs: Vec<Job>) -> JobPage {
    let total = jobs.len() as u64;
    Page::new(jobs, total)
}

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn status_error(status: u16, code: &str, message: &str) -> ApiError {
    ApiError::Status {
        status,
        code: code.to_string(),
        message: message.to_string(),
        request_id: Some("req-test".to_string()),
    }
}

pub fn server_error() -> ApiError {
    status_error(500, "SERVER_ERROR", "Internal error")
}

pub mod create;
pub mod job;
pub mod page;

pub use create::{CreateJobForm, CreateJobRequest, JobSource, ProcessingOptions, SourceKind};
pub use job::{format_duration, Job, JobStatus, JobType, Project};
pub use page::{JobPage, Page, Pagination, ProjectPage};

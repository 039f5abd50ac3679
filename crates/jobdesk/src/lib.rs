pub mod api;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod models;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod resource;
pub mod secrets;
pub mod selection;
pub mod view;
pub mod watcher;

pub use api::{HttpJobsApi, JobsApi};
pub use config::{load_config, load_config_from_str, load_default_config, Config};
pub use controller::{ControllerOptions, JobsController, JobsSnapshot};
pub use debounce::Debouncer;
pub use error::{error_message, ApiError, ConfigError, ErrorInfo, ValidationError};
pub use models::{CreateJobForm, CreateJobRequest, Job, JobPage, JobSource, JobStatus, JobType, Project};
pub use mutation::{AssumeYes, ConfirmPrompt, MutationDispatcher, MutationKind, MutationOutcome};
pub use notify::{Notification, Notifier, Tone};
pub use query::{Filter, JobQueryParams, LocationStore, MemoryLocation, QueryStateSync, ViewState};
pub use resource::{QueryOptions, QuerySnapshot, ResourceQuery};
pub use secrets::{SecretError, TokenSources};
pub use selection::SelectionTracker;
pub use view::JobsView;
pub use watcher::{JobWatcher, WatchSnapshot};

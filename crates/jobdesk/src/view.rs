//! Presentation contracts.
//!
//! Plain data computed from controller state. A front-end renders these and
//! routes user input back to the controller; nothing here holds state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorInfo;
use crate::models::{format_duration, Job, JobStatus, JobType, Pagination, Project};
use crate::query::ViewState;
use crate::selection::SelectionTracker;

/// Counts shown in the page header.
///
/// Status counts cover the loaded page only; `total` is the server's count
/// across all pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: u64,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobStats {
    pub fn from_page(jobs: &[Job], total: u64) -> Self {
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        Self {
            total,
            pending: count(JobStatus::Pending),
            running: count(JobStatus::Running),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    View,
    Start,
    Cancel,
    Retry,
    Delete,
}

/// Actions offered for a job in `status`.
pub fn row_actions(status: JobStatus) -> Vec<RowAction> {
    let mut actions = vec![RowAction::View];
    match status {
        JobStatus::Pending => actions.push(RowAction::Start),
        JobStatus::Running => actions.push(RowAction::Cancel),
        JobStatus::Failed => actions.push(RowAction::Retry),
        JobStatus::Completed | JobStatus::Cancelled => {}
    }
    actions.push(RowAction::Delete);
    actions
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRow {
    pub id: String,
    pub short_id: String,
    pub display_name: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: u8,
    pub duration: Option<String>,
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub checked: bool,
    pub actions: Vec<RowAction>,
    /// Actions with an operation in flight for this row.
    pub busy: Vec<RowAction>,
}

impl JobRow {
    /// `is_busy` reports whether an action is in flight for the given job id.
    pub fn new(
        job: &Job,
        selection: &SelectionTracker,
        is_busy: impl Fn(RowAction, &str) -> bool,
    ) -> Self {
        let actions = row_actions(job.status);
        let busy = actions
            .iter()
            .copied()
            .filter(|action| is_busy(*action, &job.id))
            .collect();

        Self {
            id: job.id.clone(),
            short_id: job.short_id().to_string(),
            display_name: job.display_name(),
            job_type: job.job_type,
            status: job.status,
            progress: job.progress_percent(),
            duration: job.duration.map(format_duration),
            project: job.project.as_ref().map(|p| p.name.clone()),
            created_at: job.created_at,
            checked: selection.is_selected(&job.id),
            actions,
            busy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderView {
    pub stats: JobStats,
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterBarView {
    /// The immediate search text, not the debounced one.
    pub search: String,
    pub status: String,
    pub job_type: String,
    pub project: String,
    pub expanded: bool,
    pub has_active_filters: bool,
    pub status_options: Vec<SelectOption>,
    pub type_options: Vec<SelectOption>,
    pub project_options: Vec<SelectOption>,
}

impl FilterBarView {
    /// `search` is the raw input text; `state` holds the committed filters.
    pub fn new(search: &str, state: &ViewState, expanded: bool, projects: &[Project]) -> Self {
        let all = SelectOption::new(crate::query::ALL, "All");

        let mut status_options = vec![all.clone()];
        status_options.extend(
            JobStatus::ALL
                .iter()
                .map(|s| SelectOption::new(s.as_str(), &capitalize(s.as_str()))),
        );

        let mut type_options = vec![all.clone()];
        type_options.extend(
            JobType::ALL
                .iter()
                .map(|t| SelectOption::new(t.as_str(), t.label())),
        );

        let mut project_options = vec![all];
        project_options.extend(projects.iter().map(|p| SelectOption::new(&p.id, &p.name)));

        Self {
            search: search.to_string(),
            status: state.status.to_string(),
            job_type: state.job_type.to_string(),
            project: state.project.to_string(),
            expanded,
            has_active_filters: state.has_active_filters(),
            status_options,
            type_options,
            project_options,
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub rows: Vec<JobRow>,
    pub all_checked: bool,
    pub selected_count: usize,
    pub is_loading: bool,
}

impl TableView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDialogView {
    pub open: bool,
    pub submitting: bool,
    pub projects: Vec<SelectOption>,
    pub type_options: Vec<SelectOption>,
}

impl CreateDialogView {
    pub fn new(open: bool, submitting: bool, projects: &[Project]) -> Self {
        Self {
            open,
            submitting,
            projects: projects
                .iter()
                .map(|p| SelectOption::new(&p.id, &p.name))
                .collect(),
            type_options: JobType::ALL
                .iter()
                .map(|t| SelectOption::new(t.as_str(), t.label()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationView {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl From<Pagination> for PaginationView {
    fn from(pagination: Pagination) -> Self {
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total: pagination.total,
            total_pages: pagination.total_pages(),
            has_next: pagination.has_next(),
            has_previous: pagination.has_previous(),
        }
    }
}

/// Everything the jobs page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobsView {
    pub header: HeaderView,
    pub filters: FilterBarView,
    pub table: TableView,
    pub dialog: CreateDialogView,
    pub pagination: PaginationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Canonical query string of the current view state.
    pub query_string: String,
}

impl JobsView {
    pub fn checked_ids(&self) -> Vec<&str> {
        self.table
            .rows
            .iter()
            .filter(|row| row.checked)
            .map(|row| row.id.as_str())
            .collect()
    }
}

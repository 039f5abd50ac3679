//! Jobs list controller.
//!
//! Owns the list's local state and wires the pieces together:
//!
//! - filter, search and page changes go through [`QueryStateSync`], which
//!   mirrors them into the location with one write per user action
//! - the search box feeds a [`Debouncer`]; only the debounced term reaches
//!   the query params
//! - params are rebuilt after every change and handed to the jobs
//!   [`ResourceQuery`], which fetches only when they actually differ
//! - mutations go through the [`MutationDispatcher`], which notifies and
//!   refetches once they settle
//!
//! Methods that may trigger a fetch return its `JoinHandle`; callers can
//! await it or ignore it and watch [`JobsController::subscribe_jobs`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::api::JobsApi;
use crate::config::JobsConfig;
use crate::debounce::Debouncer;
use crate::models::{CreateJobForm, Job, JobPage, JobStatus, JobType, Pagination, ProjectPage};
use crate::mutation::{ConfirmPrompt, MutationDispatcher, MutationKind, MutationOutcome};
use crate::notify::{Notification, Notifier};
use crate::query::{Filter, JobQueryParams, LocationStore, QueryStateSync, ViewState};
use crate::resource::{QueryOptions, QuerySnapshot, ResourceQuery};
use crate::selection::SelectionTracker;
use crate::view::{
    CreateDialogView, FilterBarView, HeaderView, JobRow, JobStats, JobsView, RowAction,
    TableView,
};

pub type JobsSnapshot = QuerySnapshot<JobQueryParams, JobPage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub projects_limit: u32,
    pub query: QueryOptions,
    pub notification_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&JobsConfig::default())
    }
}

impl From<&JobsConfig> for ControllerOptions {
    fn from(config: &JobsConfig) -> Self {
        Self {
            page_size: config.page_size,
            search_debounce: config.search_debounce(),
            projects_limit: config.projects_limit,
            query: QueryOptions {
                stale_time: config.stale_time(),
                retries: config.query_retries,
            },
            notification_capacity: config.notification_capacity,
        }
    }
}

pub struct JobsController {
    options: ControllerOptions,
    sync: QueryStateSync,
    search: Debouncer<String>,
    jobs: ResourceQuery<JobQueryParams, JobPage>,
    projects: ResourceQuery<u32, ProjectPage>,
    mutations: MutationDispatcher,
    notifier: Notifier,
    selection: SelectionTracker,
    filters_expanded: bool,
    dialog_open: bool,
}

impl JobsController {
    pub fn new(
        api: Arc<dyn JobsApi>,
        location: Arc<dyn LocationStore>,
        options: ControllerOptions,
    ) -> Self {
        let jobs_api = Arc::clone(&api);
        let jobs = ResourceQuery::new("jobs", options.query, move |params: JobQueryParams| {
            let api = Arc::clone(&jobs_api);
            async move { api.list_jobs(&params).await }
        });

        let projects_api = Arc::clone(&api);
        let projects = ResourceQuery::new("projects", options.query, move |limit: u32| {
            let api = Arc::clone(&projects_api);
            async move { api.list_projects(limit).await }
        });

        let notifier = Notifier::new(options.notification_capacity);
        let mutations = MutationDispatcher::new(api, jobs.clone(), notifier.clone());

        Self {
            options,
            sync: QueryStateSync::new(location),
            search: Debouncer::new(String::new(), options.search_debounce),
            jobs,
            projects,
            mutations,
            notifier,
            selection: SelectionTracker::new(),
            filters_expanded: false,
            dialog_open: false,
        }
    }

    /// Loads state from the location and issues the first fetches.
    pub fn mount(&mut self) -> Option<JoinHandle<()>> {
        let state = self.sync.initialize_from_location().clone();
        log::debug!("Mounting jobs list with {:?}", state);
        self.search.reset(state.search);
        // Project names are only used for labels; a failure is logged by the query.
        self.projects.set_params(self.options.projects_limit);
        self.apply_params()
    }

    /// Cancels any pending debounced search.
    pub fn unmount(&mut self) {
        if self.search.cancel() {
            log::debug!("Dropped pending search on unmount");
        }
    }

    /// Params for the current state and debounced search term.
    pub fn params(&self) -> JobQueryParams {
        self.sync
            .state()
            .to_params(&self.search.debounced(), self.options.page_size)
    }

    pub fn state(&self) -> &ViewState {
        self.sync.state()
    }

    /// The immediate search text.
    pub fn search_input(&self) -> &str {
        self.search.immediate()
    }

    /// Rebuilds params and fetches if they changed.
    pub fn apply_params(&mut self) -> Option<JoinHandle<()>> {
        self.jobs.set_params(self.params())
    }

    /// Records a keystroke.
    ///
    /// The page reset is fetched right away with the current debounced term;
    /// the new term follows once input settles, see [`Self::settle`].
    pub fn on_search_change(&mut self, value: &str) -> Option<JoinHandle<()>> {
        self.search.set(value.to_string());
        self.sync.set_search(value);
        self.apply_params()
    }

    /// Waits for the debounced search to catch up, then applies params.
    pub async fn settle(&mut self) -> Option<JoinHandle<()>> {
        self.search.wait().await;
        self.apply_params()
    }

    /// Receiver notified whenever the debounced search term changes.
    ///
    /// Event loops call [`Self::apply_params`] when it fires.
    pub fn debounced_search(&self) -> watch::Receiver<String> {
        self.search.subscribe()
    }

    pub fn on_status_change(&mut self, status: Filter<JobStatus>) -> Option<JoinHandle<()>> {
        self.sync.set_status(status);
        self.apply_params()
    }

    pub fn on_type_change(&mut self, job_type: Filter<JobType>) -> Option<JoinHandle<()>> {
        self.sync.set_job_type(job_type);
        self.apply_params()
    }

    pub fn on_project_change(&mut self, project: Filter<String>) -> Option<JoinHandle<()>> {
        self.sync.set_project(project);
        self.apply_params()
    }

    pub fn on_page_change(&mut self, page: u32) -> Option<JoinHandle<()>> {
        self.sync.set_page(page);
        self.apply_params()
    }

    /// Resets every filter and the page in a single location write.
    pub fn clear_filters(&mut self) -> Option<JoinHandle<()>> {
        self.search.reset(String::new());
        self.sync.clear_all();
        self.apply_params()
    }

    pub fn toggle_filters(&mut self) {
        self.filters_expanded = !self.filters_expanded;
    }

    /// Re-issues the current params, bypassing the cache.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        self.jobs.refetch()
    }

    pub fn jobs_snapshot(&self) -> JobsSnapshot {
        self.jobs.snapshot()
    }

    pub fn subscribe_jobs(&self) -> watch::Receiver<JobsSnapshot> {
        self.jobs.subscribe()
    }

    /// Jobs on the most recently loaded page.
    pub fn visible_jobs(&self) -> Vec<Job> {
        self.jobs
            .snapshot()
            .data
            .map(|page| page.results)
            .unwrap_or_default()
    }

    fn visible_ids(&self) -> Vec<String> {
        self.visible_jobs().into_iter().map(|job| job.id).collect()
    }

    /// Looks a job up on the loaded page.
    pub fn find_job(&self, id: &str) -> Option<Job> {
        self.visible_jobs().into_iter().find(|job| job.id == id)
    }

    pub fn toggle_selection(&mut self, id: &str) -> bool {
        self.selection.toggle(id)
    }

    pub fn toggle_select_all(&mut self) {
        let visible = self.visible_ids();
        self.selection.retain_visible(&visible);
        self.selection.select_all_visible(&visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn mutations(&self) -> &MutationDispatcher {
        &self.mutations
    }

    pub async fn start(&self, job: &Job) -> MutationOutcome<Option<Job>> {
        self.mutations.start(job).await
    }

    pub async fn cancel(&self, job: &Job) -> MutationOutcome<Option<Job>> {
        self.mutations.cancel(job).await
    }

    pub async fn retry(&self, job: &Job) -> MutationOutcome<Option<Job>> {
        self.mutations.retry(job).await
    }

    pub async fn delete(&self, job: &Job, prompt: &dyn ConfirmPrompt) -> MutationOutcome<()> {
        self.mutations.delete(job, prompt).await
    }

    pub fn open_create_dialog(&mut self) {
        self.dialog_open = true;
    }

    pub fn close_create_dialog(&mut self) {
        self.dialog_open = false;
    }

    pub fn is_create_dialog_open(&self) -> bool {
        self.dialog_open
    }

    /// Submits the create dialog. It closes on success and stays open on failure.
    pub async fn submit_create(&mut self, form: CreateJobForm) -> MutationOutcome<Job> {
        let outcome = self.mutations.create_from_form(form).await;
        if outcome.is_success() {
            self.dialog_open = false;
        }
        outcome
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn projects(&self) -> Vec<crate::models::Project> {
        self.projects
            .snapshot()
            .data
            .map(|page| page.results)
            .unwrap_or_default()
    }

    /// Builds the render model. Selected ids missing from the loaded page are evicted first.
    pub fn view(&mut self) -> JobsView {
        let snapshot = self.jobs.snapshot();
        let (jobs, total) = snapshot
            .data
            .clone()
            .map(|page| (page.results, page.total))
            .unwrap_or_default();

        let visible: Vec<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
        let evicted = self.selection.retain_visible(&visible);
        if evicted > 0 {
            log::debug!("Evicted {} selected ids no longer on the page", evicted);
        }

        let mutations = &self.mutations;
        let rows: Vec<JobRow> = jobs
            .iter()
            .map(|job| {
                JobRow::new(job, &self.selection, |action, id| {
                    row_mutation(action)
                        .is_some_and(|kind| mutations.is_pending(kind, Some(id)))
                })
            })
            .collect();

        let state = self.sync.state();
        let projects = self.projects();

        JobsView {
            header: HeaderView {
                stats: JobStats::from_page(&jobs, total),
                is_loading: snapshot.is_loading,
            },
            filters: FilterBarView::new(
                self.search.immediate(),
                state,
                self.filters_expanded,
                &projects,
            ),
            table: TableView {
                all_checked: self.selection.is_all_selected(&visible),
                selected_count: self.selection.len(),
                is_loading: snapshot.is_loading,
                rows,
            },
            dialog: CreateDialogView::new(
                self.dialog_open,
                self.mutations.is_kind_pending(MutationKind::Create),
                &projects,
            ),
            pagination: Pagination::new(state.page, self.options.page_size, total).into(),
            error: snapshot.error,
            query_string: self.sync.location().to_string(),
        }
    }
}

fn row_mutation(action: RowAction) -> Option<MutationKind> {
    match action {
        RowAction::Start => Some(MutationKind::Start),
        RowAction::Cancel => Some(MutationKind::Cancel),
        RowAction::Retry => Some(MutationKind::Retry),
        RowAction::Delete => Some(MutationKind::Delete),
        RowAction::View => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let config = JobsConfig {
            page_size: 50,
            search_debounce_ms: 150,
            ..Default::default()
        };
        let options = ControllerOptions::from(&config);
        assert_eq!(options.page_size, 50);
        assert_eq!(options.search_debounce, Duration::from_millis(150));
        assert_eq!(options.projects_limit, 100);
        assert_eq!(options.query.retries, 2);
        assert_eq!(options.query.stale_time, Duration::from_secs(30));
    }

    #[test]
    fn test_row_actions_map_to_mutations() {
        assert_eq!(row_mutation(RowAction::View), None);
        assert_eq!(row_mutation(RowAction::Retry), Some(MutationKind::Retry));
    }
}

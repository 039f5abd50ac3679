//! Keeps [`ViewState`] and the location's query string in step.

use std::sync::Arc;

use super::location::{LocationStore, QueryString};
use super::params::{Filter, ParamPatch, ViewState, RECOGNIZED_KEYS};
use crate::models::{JobStatus, JobType};

/// Owns the list view state and mirrors every change into a [`LocationStore`].
///
/// Each public mutator performs at most one location write.
pub struct QueryStateSync {
    location: Arc<dyn LocationStore>,
    state: ViewState,
}

impl QueryStateSync {
    pub fn new(location: Arc<dyn LocationStore>) -> Self {
        Self {
            location,
            state: ViewState::default(),
        }
    }

    /// Loads state from the current query string without writing to it.
    pub fn initialize_from_location(&mut self) -> &ViewState {
        self.state = ViewState::from_query(&self.location.read());
        &self.state
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn location(&self) -> QueryString {
        self.location.read()
    }

    /// Merges `patch` into the query string in a single write.
    pub fn update_params(&mut self, patch: ParamPatch) {
        if patch.is_empty() {
            return;
        }
        let mut query = self.location.read();
        patch.apply_to(&mut query);
        self.commit(query);
    }

    pub fn set_search(&mut self, search: &str) {
        self.update_params(ParamPatch::new().search(search).page(1));
    }

    pub fn set_status(&mut self, status: Filter<JobStatus>) {
        self.update_params(ParamPatch::new().status(&status).page(1));
    }

    pub fn set_job_type(&mut self, job_type: Filter<JobType>) {
        self.update_params(ParamPatch::new().job_type(&job_type).page(1));
    }

    pub fn set_project(&mut self, project: Filter<String>) {
        self.update_params(ParamPatch::new().project(&project).page(1));
    }

    pub fn set_page(&mut self, page: u32) {
        self.update_params(ParamPatch::new().page(page.max(1)));
    }

    /// Resets all five values and drops their keys in one write.
    pub fn clear_all(&mut self) {
        let mut query = self.location.read();
        for key in RECOGNIZED_KEYS {
            query.remove(key);
        }
        self.commit(query);
    }

    fn commit(&mut self, query: QueryString) {
        log::debug!("Updating location query: '{}'", query);
        self.state = ViewState::from_query(&query);
        self.location.write(query);
    }
}

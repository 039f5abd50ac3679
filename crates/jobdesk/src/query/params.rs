//! List view state and the params derived from it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::location::QueryString;
use crate::models::{JobStatus, JobType};

pub const KEY_SEARCH: &str = "search";
pub const KEY_STATUS: &str = "status";
pub const KEY_TYPE: &str = "type";
pub const KEY_PROJECT: &str = "project_id";
pub const KEY_PAGE: &str = "page";

/// Every key the list view owns in the query string.
pub const RECOGNIZED_KEYS: [&str; 5] = [KEY_SEARCH, KEY_STATUS, KEY_TYPE, KEY_PROJECT, KEY_PAGE];

/// Query-string sentinel meaning "no filter".
pub const ALL: &str = "all";

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A select filter: either everything or one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Filter<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Filter<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Filter::All => None,
            Filter::Only(value) => Some(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Filter::All => None,
            Filter::Only(value) => Some(value),
        }
    }
}

impl<T: FromStr> Filter<T> {
    /// Parses a query-string value. Empty, `all` and unparseable values are [`Filter::All`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(ALL) => Filter::All,
            Some(value) => value.parse().map(Filter::Only).unwrap_or(Filter::All),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str(ALL),
            Filter::Only(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl<T> From<Option<T>> for Filter<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Filter::Only(value),
            None => Filter::All,
        }
    }
}

/// The five pieces of shareable list state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search: String,
    pub status: Filter<JobStatus>,
    pub job_type: Filter<JobType>,
    pub project: Filter<String>,
    /// 1-indexed.
    pub page: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: Filter::All,
            job_type: Filter::All,
            project: Filter::All,
            page: 1,
        }
    }
}

impl ViewState {
    /// Reads the recognized keys. Unknown values fall back to their defaults.
    pub fn from_query(query: &QueryString) -> Self {
        Self {
            search: query.get(KEY_SEARCH).unwrap_or_default().to_string(),
            status: Filter::parse(query.get(KEY_STATUS)),
            job_type: Filter::parse(query.get(KEY_TYPE)),
            project: Filter::parse(query.get(KEY_PROJECT)),
            page: parse_page(query.get(KEY_PAGE)),
        }
    }

    /// Encodes the state as the patch [`crate::query::QueryStateSync::update_params`] expects.
    pub fn to_patch(&self) -> ParamPatch {
        ParamPatch::new()
            .search(&self.search)
            .status(&self.status)
            .job_type(&self.job_type)
            .project(&self.project)
            .page(self.page)
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search.trim().is_empty()
            || !self.status.is_all()
            || !self.job_type.is_all()
            || !self.project.is_all()
    }

    /// Builds list params, using `search` in place of `self.search`.
    ///
    /// The controller passes the debounced search term here.
    pub fn to_params(&self, search: &str, limit: u32) -> JobQueryParams {
        let search = search.trim();
        JobQueryParams {
            page: self.page.max(1),
            limit,
            search: (!search.is_empty()).then(|| search.to_string()),
            status: self.status.as_option().copied(),
            job_type: self.job_type.as_option().copied(),
            project_id: self
                .project
                .as_option()
                .filter(|id| !id.trim().is_empty())
                .cloned(),
        }
    }
}

/// Positive integer, else 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

/// A partial update to the recognized keys.
///
/// Keys not named in the patch are left untouched. An empty or `all` value
/// removes its key; page 1 is encoded as a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamPatch {
    entries: Vec<(&'static str, String)>,
}

impl ParamPatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, key: &'static str, value: String) -> Self {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value));
        self
    }

    pub fn search(self, search: &str) -> Self {
        self.with(KEY_SEARCH, search.trim().to_string())
    }

    pub fn status(self, status: &Filter<JobStatus>) -> Self {
        self.with(KEY_STATUS, status.to_string())
    }

    pub fn job_type(self, job_type: &Filter<JobType>) -> Self {
        self.with(KEY_TYPE, job_type.to_string())
    }

    pub fn project(self, project: &Filter<String>) -> Self {
        self.with(KEY_PROJECT, project.to_string())
    }

    pub fn page(self, page: u32) -> Self {
        let value = if page <= 1 {
            String::new()
        } else {
            page.to_string()
        };
        self.with(KEY_PAGE, value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges the patch into `query`, leaving unrelated keys alone.
    pub fn apply_to(&self, query: &mut QueryString) {
        for (key, value) in &self.entries {
            if value.is_empty() || value == ALL {
                query.remove(key);
            } else {
                query.set(key, value);
            }
        }
    }
}

/// Normalized params for one list request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobQueryParams {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Default for JobQueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
            status: None,
            job_type: None,
            project_id: None,
        }
    }
}

impl JobQueryParams {
    /// The canonical query string for these params (no `limit`, page 1 omitted).
    pub fn to_query_string(&self) -> QueryString {
        let state = ViewState {
            search: self.search.clone().unwrap_or_default(),
            status: self.status.into(),
            job_type: self.job_type.into(),
            project: self.project_id.clone().into(),
            page: self.page,
        };
        let mut query = QueryString::new();
        state.to_patch().apply_to(&mut query);
        query
    }

    /// Parses params back from a query string.
    pub fn from_query_string(query: &QueryString, limit: u32) -> Self {
        let state = ViewState::from_query(query);
        state.to_params(&state.search, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_reads_recognized_keys() {
        let query = QueryString::parse("search=abc&status=running&type=convert&project_id=p-1&page=2");
        let state = ViewState::from_query(&query);

        assert_eq!(state.search, "abc");
        assert_eq!(state.status, Filter::Only(JobStatus::Running));
        assert_eq!(state.job_type, Filter::Only(JobType::Convert));
        assert_eq!(state.project, Filter::Only("p-1".to_string()));
        assert_eq!(state.page, 2);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let query = QueryString::parse("status=bogus&type=ocr&project_id=all&page=-3");
        let state = ViewState::from_query(&query);
        assert_eq!(state, ViewState::default());

        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("2.5")), 1);
        assert_eq!(parse_page(Some("7")), 7);
        assert_eq!(parse_page(None), 1);
    }

    #[test]
    fn test_params_round_trip_through_query_string() {
        let params = JobQueryParams {
            search: Some("abc".to_string()),
            status: Some(JobStatus::Running),
            page: 2,
            ..Default::default()
        };
        let query = params.to_query_string();
        assert_eq!(query.to_string(), "search=abc&status=running&page=2");

        let parsed = JobQueryParams::from_query_string(&query, DEFAULT_PAGE_SIZE);
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_all_and_page_one_are_omitted() {
        let state = ViewState {
            status: Filter::All,
            page: 1,
            ..Default::default()
        };
        let mut query = QueryString::new();
        state.to_patch().apply_to(&mut query);
        assert!(query.is_empty());
    }

    #[test]
    fn test_patch_leaves_unrelated_keys() {
        let mut query = QueryString::parse("tab=history&status=failed&page=4");
        ParamPatch::new()
            .status(&Filter::All)
            .page(1)
            .apply_to(&mut query);
        assert_eq!(query.to_string(), "tab=history");
    }

    #[test]
    fn test_to_params_uses_given_search() {
        let state = ViewState {
            search: "invoice".to_string(),
            project: Filter::Only("p-9".to_string()),
            page: 3,
            ..Default::default()
        };
        let params = state.to_params("inv", 20);
        assert_eq!(params.search.as_deref(), Some("inv"));
        assert_eq!(params.project_id.as_deref(), Some("p-9"));
        assert_eq!(params.page, 3);
        assert_eq!(state.to_params("  ", 20).search, None);
    }

    #[test]
    fn test_params_serialize_for_http() {
        let params = JobQueryParams {
            job_type: Some(JobType::Extract),
            ..Default::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"page": 1, "limit": 20, "type": "extract"}));
    }
}

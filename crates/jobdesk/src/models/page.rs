//! Pagination envelopes.

use serde::{Deserialize, Serialize};

use super::job::{Job, Project};

/// One page of a listed resource.
///
/// Decodes both the `{results, total}` envelope and the
/// `{data, pagination: {total, ..}}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "PageEnvelope<T>",
    bound(deserialize = "T: Deserialize<'de>", serialize = "T: Serialize")
)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub total: u64,
}

pub type JobPage = Page<Job>;
pub type ProjectPage = Page<Project>;

impl<T> Page<T> {
    pub fn new(results: Vec<T>, total: u64) -> Self {
        Self { results, total }
    }

    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageEnvelope<T> {
    Results {
        results: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
    },
    Data {
        data: Vec<T>,
        pagination: PaginationEnvelope,
    },
}

#[derive(Deserialize)]
struct PaginationEnvelope {
    total: u64,
}

impl<T> From<PageEnvelope<T>> for Page<T> {
    fn from(envelope: PageEnvelope<T>) -> Self {
        match envelope {
            PageEnvelope::Results { results, total } => {
                let total = total.unwrap_or(results.len() as u64);
                Page { results, total }
            }
            PageEnvelope::Data { data, pagination } => Page {
                results: data,
                total: pagination.total,
            },
        }
    }
}

/// Position within a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self { page, limit, total }
    }

    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit)) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

//! Resource query facade.
//!
//! A [`ResourceQuery`] turns "the current params" into "the current result".
//! Callers hand it params with [`ResourceQuery::set_params`]; it fetches only
//! when they differ from the last params it issued, and publishes every state
//! change as a [`QuerySnapshot`] on a watch channel.
//!
//! Responses can resolve out of order. Each fetch is tagged with a generation
//! number and a response is only applied while its generation is still the
//! newest one issued, so a slow response can never overwrite a newer one.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use moka::sync::Cache;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{ApiError, ErrorInfo};

const RETRY_BASE: Duration = Duration::from_millis(1000);
const RETRY_CAP: Duration = Duration::from_millis(30_000);
const CACHE_CAPACITY: u64 = 256;

type Fetcher<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a successful result is reused for identical params.
    /// Zero disables caching.
    pub stale_time: Duration,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            retries: 2,
        }
    }
}

/// What a query currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot<P, T> {
    /// Last successful result. Kept while loading and after failures.
    pub data: Option<T>,
    /// Params `data` was fetched for.
    pub data_params: Option<P>,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<P, T> Default for QuerySnapshot<P, T> {
    fn default() -> Self {
        Self {
            data: None,
            data_params: None,
            is_loading: false,
            error: None,
            updated_at: None,
        }
    }
}

/// Whether a failed fetch should be attempted again.
///
/// Unauthorized and not-found answers will not change on retry, and neither
/// will locally rejected requests.
pub fn should_retry(error: &ApiError, failures: u32, max_retries: u32) -> bool {
    if failures > max_retries {
        return false;
    }
    !matches!(error.status(), Some(401) | Some(404)) && !matches!(error, ApiError::Validation(_))
}

/// `min(1000ms * 2^attempt, 30s)`.
pub fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(RETRY_CAP)
}

pub struct ResourceQuery<P, T> {
    inner: Arc<Inner<P, T>>,
}

impl<P, T> Clone for ResourceQuery<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P, T> {
    name: &'static str,
    fetcher: Fetcher<P, T>,
    options: QueryOptions,
    cache: Option<Cache<P, T>>,
    generation: AtomicU64,
    last_params: Mutex<Option<P>>,
    state: watch::Sender<QuerySnapshot<P, T>>,
}

impl<P, T> ResourceQuery<P, T>
where
    P: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(name: &'static str, options: QueryOptions, fetcher: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let cache = (!options.stale_time.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(options.stale_time)
                .build()
        });
        let (state, _) = watch::channel(QuerySnapshot::default());

        Self {
            inner: Arc::new(Inner {
                name,
                fetcher: Arc::new(move |params| fetcher(params).boxed()),
                options,
                cache,
                generation: AtomicU64::new(0),
                last_params: Mutex::new(None),
                state,
            }),
        }
    }

    /// Fetches if `params` differ from the last issued params.
    ///
    /// Returns the handle of the fetch that was started, if any.
    pub fn set_params(&self, params: P) -> Option<JoinHandle<()>> {
        let generation = {
            let mut last = self.lock_last_params();
            if last.as_ref() == Some(&params) {
                return None;
            }
            *last = Some(params.clone());
            self.inner.next_generation()
        };
        Some(self.issue(generation, params, true))
    }

    /// Re-issues the last params, bypassing the cache.
    pub fn refetch(&self) -> Option<JoinHandle<()>> {
        let (generation, params) = {
            let last = self.lock_last_params();
            let params = last.clone()?;
            (self.inner.next_generation(), params)
        };
        Some(self.issue(generation, params, false))
    }

    /// Drops every cached result.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
        }
    }

    pub fn params(&self) -> Option<P> {
        self.lock_last_params().clone()
    }

    pub fn snapshot(&self) -> QuerySnapshot<P, T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot<P, T>> {
        self.inner.state.subscribe()
    }

    // `generation` must come from `next_generation` while `last_params` is
    // still locked, so generation order always matches params order.
    fn issue(&self, generation: u64, params: P, use_cache: bool) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        log::debug!(
            "[{}] fetch #{} issued for {:?}",
            inner.name,
            generation,
            params
        );
        // A newer fetch may already have settled; its state must not flip back to loading.
        inner.state.send_if_modified(|state| {
            if !inner.is_current(generation) {
                return false;
            }
            state.is_loading = true;
            true
        });

        tokio::spawn(async move {
            if use_cache {
                if let Some(hit) = inner.cache.as_ref().and_then(|c| c.get(&params)) {
                    log::debug!("[{}] fetch #{} served from cache", inner.name, generation);
                    inner.apply(generation, params, Ok(hit));
                    return;
                }
            }

            let result = inner.fetch_with_retry(generation, &params).await;
            if let (Ok(data), Some(cache)) = (&result, &inner.cache) {
                cache.insert(params.clone(), data.clone());
            }
            inner.apply(generation, params, result);
        })
    }

    fn lock_last_params(&self) -> std::sync::MutexGuard<'_, Option<P>> {
        match self.inner.last_params.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Query params lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl<P, T> Inner<P, T>
where
    P: Clone + fmt::Debug,
    T: Clone,
{
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn fetch_with_retry(&self, generation: u64, params: &P) -> Result<T, ApiError> {
        let mut failures = 0;
        loop {
            match (self.fetcher)(params.clone()).await {
                Ok(data) => return Ok(data),
                Err(error) => {
                    failures += 1;
                    if !self.is_current(generation)
                        || !should_retry(&error, failures, self.options.retries)
                    {
                        return Err(error);
                    }
                    let delay = retry_delay(failures - 1);
                    log::warn!(
                        "[{}] fetch #{} failed ({}), retrying in {:?}",
                        self.name,
                        generation,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Applies a response if no newer fetch has been issued.
    fn apply(&self, generation: u64, params: P, result: Result<T, ApiError>) {
        let applied = self.state.send_if_modified(|state| {
            // Checked under the channel lock so a newer fetch's loading flag is never cleared.
            if !self.is_current(generation) {
                return false;
            }
            state.is_loading = false;
            match &result {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.data_params = Some(params.clone());
                    state.error = None;
                    state.updated_at = Some(Utc::now());
                }
                Err(error) => {
                    state.error = Some(ErrorInfo::from(error));
                }
            }
            true
        });

        match (&result, applied) {
            (_, false) => log::debug!(
                "[{}] discarding stale response #{} for {:?}",
                self.name,
                generation,
                params
            ),
            (Err(error), true) => log::error!("[{}] fetch failed: {}", self.name, error),
            (Ok(_), true) => {}
        }
    }
}

//! The query-string surface the list state is mirrored into.

use std::fmt;
use std::sync::Mutex;

/// An ordered list of query-string pairs.
///
/// Unlike a map, pairs keep their original order so that keys the list view
/// does not own survive a rewrite untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `a=1&b=2`, with or without a leading `?`.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        let pairs = url::form_urlencoded::parse(input.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Sets `key`, keeping its position if present and dropping duplicates.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                self.pairs[idx].1 = value.to_string();
                let mut seen = false;
                self.pairs.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// Where the list view's query string lives.
///
/// A browser would back this with the address bar; the CLI and tests use
/// [`MemoryLocation`].
pub trait LocationStore: Send + Sync {
    fn read(&self) -> QueryString;
    fn write(&self, query: QueryString);
}

/// In-memory location that records every write.
#[derive(Debug, Default)]
pub struct MemoryLocation {
    current: Mutex<QueryString>,
    writes: Mutex<Vec<QueryString>>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_query(input: &str) -> Self {
        Self {
            current: Mutex::new(QueryString::parse(input)),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Number of writes since creation.
    pub fn write_count(&self) -> usize {
        self.history().len()
    }

    pub fn history(&self) -> Vec<QueryString> {
        match self.writes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                log::warn!("Location history lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }
}

impl LocationStore for MemoryLocation {
    fn read(&self) -> QueryString {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                log::warn!("Location lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    fn write(&self, query: QueryString) {
        {
            let mut writes = match self.writes.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    log::warn!("Location history lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            writes.push(query.clone());
        }

        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Location lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *current = query;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let query = QueryString::parse("?search=big+invoice&status=running&tab=2");
        assert_eq!(query.get("search"), Some("big invoice"));
        assert_eq!(query.get("status"), Some("running"));
        assert_eq!(query.to_string(), "search=big+invoice&status=running&tab=2");
    }

    #[test]
    fn test_set_keeps_position_and_drops_duplicates() {
        let mut query = QueryString::parse("a=1&status=x&b=2&status=y");
        query.set("status", "failed");
        assert_eq!(query.to_string(), "a=1&status=failed&b=2");

        query.set("page", "3");
        assert_eq!(query.to_string(), "a=1&status=failed&b=2&page=3");

        query.remove("a");
        assert!(!query.contains_key("a"));
    }

    #[test]
    fn test_memory_location_records_writes() {
        let location = MemoryLocation::from_query("tab=2");
        assert_eq!(location.write_count(), 0);

        let mut next = location.read();
        next.set("page", "2");
        location.write(next);

        assert_eq!(location.write_count(), 1);
        assert_eq!(location.read().to_string(), "tab=2&page=2");
    }
}

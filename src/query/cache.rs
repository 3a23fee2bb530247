//! Bounded query-result cache.
//!
//! A mutex-guarded map with insertion-order eviction: when the cache is
//! full, the oldest entry is dropped. Keys are the canonical normalized
//! form of the query (lowercased, trimmed) plus the limit, so equivalent
//! queries share an entry.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::SearchResult;

/// Builds the cache key for a query and limit.
#[must_use]
pub fn cache_key(query: &str, limit: usize) -> String {
    format!("search:{}:{limit}", query.trim().to_lowercase())
}

#[derive(Default)]
struct Inner {
    map: HashMap<String, SearchResult>,
    order: VecDeque<String>,
}

/// Bounded in-memory result cache.
pub struct QueryCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl QueryCache {
    /// Creates a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns the cached result for a key, marked `from_cache`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<SearchResult> {
        #[allow(clippy::unwrap_used)] // mutex poisoning is fatal
        let inner = self.inner.lock().unwrap();
        inner.map.get(key).cloned()
    }

    /// Stores a result, evicting the oldest entry when full.
    pub fn put(&self, key: String, result: &SearchResult) {
        let mut stored = result.clone();
        stored.from_cache = true;

        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.lock().unwrap();
        if !inner.map.contains_key(&key) {
            while inner.map.len() >= self.capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.map.remove(&oldest);
                    }
                    None => break,
                }
            }
            inner.order.push_back(key.clone());
        }
        inner.map.insert(key, stored);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.lock().unwrap();
        inner.map.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! # Result Cache Module
//!
//! ## Purpose
//! Time-bounded memoization of search responses keyed by the full request
//! shape, avoiding repeated index round-trips for identical queries.
//!
//! ## Input/Output Specification
//! - **Input**: Search query parameters, ranked result lists
//! - **Output**: Stored result lists within the TTL window
//! - **Guarantee**: A hit is bit-for-bit the stored response; expired
//!   entries are misses and are overwritten on the next put
//!
//! ## Key Features
//! - Deterministic cache keys from query text, strategy, bounds and
//!   canonicalized filters
//! - Concurrent per-key access without a global lock
//! - Bounded size with simple eviction

use crate::search::{SearchQuery, SearchResult};
use crate::utils::TextUtils;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Cached entry with its insertion time
struct CachedEntry {
    results: Vec<SearchResult>,
    stored_at: Instant,
}

/// Concurrent TTL cache for search responses
pub struct ResultCache {
    entries: DashMap<u64, CachedEntry>,
    ttl: Duration,
    max_size: usize,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

/// Deterministic key over every request field that affects the response
pub fn cache_key(query: &SearchQuery) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    query.query.hash(&mut hasher);
    query.search_type.as_str().hash(&mut hasher);
    query.max_results.hash(&mut hasher);
    query.min_score.to_bits().hash(&mut hasher);
    query.filters.canonical_key().hash(&mut hasher);
    hasher.finish()
}

impl ResultCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_size,
        }
    }

    /// Look up a stored response. Expired entries are removed and reported
    /// as misses.
    pub fn get(&self, key: u64) -> Option<Vec<SearchResult>> {
        let expired = match self.entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    /// Store a response, evicting an arbitrary entry when full
    pub fn put(&self, key: u64, results: Vec<SearchResult>) {
        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            if let Some(evict) = self.entries.iter().next().map(|e| *e.key()) {
                self.entries.remove(&evict);
            }
        }

        self.entries.insert(
            key,
            CachedEntry {
                results,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop all entries. Called after corpus mutations so reads after
    /// writes never observe removed or patched documents.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
        }
    }

    /// Short preview of a query for trace logging
    pub fn describe(query: &SearchQuery) -> String {
        TextUtils::truncate(&query.query, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchQuery, SearchType};

    fn query(text: &str) -> SearchQuery {
        SearchQuery {
            query: text.to_string(),
            search_type: SearchType::Hybrid,
            filters: Default::default(),
            max_results: 10,
            min_score: 0.5,
            include_metadata: false,
        }
    }

    #[test]
    fn test_round_trip() {
        let cache = ResultCache::new(10, Duration::from_secs(300));
        let key = cache_key(&query("diabetes"));

        assert!(cache.get(key).is_none());
        cache.put(key, Vec::new());
        assert_eq!(cache.get(key), Some(Vec::new()));
    }

    #[test]
    fn test_key_depends_on_request_shape() {
        let base = query("diabetes");
        let mut different_type = query("diabetes");
        different_type.search_type = SearchType::VectorOnly;
        let mut different_bounds = query("diabetes");
        different_bounds.max_results = 5;

        assert_eq!(cache_key(&base), cache_key(&query("diabetes")));
        assert_ne!(cache_key(&base), cache_key(&different_type));
        assert_ne!(cache_key(&base), cache_key(&different_bounds));
        assert_ne!(cache_key(&base), cache_key(&query("asthma")));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = ResultCache::new(10, Duration::from_millis(20));
        let key = cache_key(&query("fever"));

        cache.put(key, Vec::new());
        assert!(cache.get(key).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(key).is_none());

        // Overwritten on the next put
        cache.put(key, Vec::new());
        assert!(cache.get(key).is_some());
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let cache = ResultCache::new(10, Duration::from_secs(300));
        cache.put(cache_key(&query("a")), Vec::new());
        cache.put(cache_key(&query("b")), Vec::new());
        assert_eq!(cache.stats().size, 2);

        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_eviction_keeps_cache_bounded() {
        let cache = ResultCache::new(3, Duration::from_secs(300));
        for i in 0..10 {
            cache.put(cache_key(&query(&format!("query {}", i))), Vec::new());
        }
        assert!(cache.stats().size <= 3);
    }
}

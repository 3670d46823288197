//! Timestamped, size-bounded cache of pathfinding results.
//!
//! Entries are keyed by the requested (start, goal) pair and hold the search
//! outcome, including "no path". Expiry is checked lazily on lookup; when an
//! insert pushes the cache past capacity the oldest entry is dropped.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::grid::TilePos;
use crate::pathfinding::Path;

/// Cache key: the start tile and the goal tile as requested by the caller.
pub type PathKey = (TilePos, TilePos);

#[derive(Debug, Clone)]
struct CacheEntry {
    path: Option<Path>,
    created: Instant,
}

/// Counters for cache behaviour, useful in logs and benchmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to search (absent or expired).
    pub misses: u64,
    /// Entries dropped for age or capacity.
    pub evictions: u64,
}

/// Bounded map from (start, goal) to the computed path.
#[derive(Debug, Clone)]
pub struct PathCache {
    entries: HashMap<PathKey, CacheEntry>,
    capacity: usize,
    timeout: Duration,
    stats: CacheStats,
}

impl PathCache {
    /// Create an empty cache.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            timeout,
            stats: CacheStats::default(),
        }
    }

    /// Look up a result. The outer `Option` is hit/miss; the inner one is
    /// the cached search outcome. Expired entries are removed and reported
    /// as a miss.
    pub fn get(&mut self, key: PathKey, now: Instant) -> Option<Option<Path>> {
        let expired = match self.entries.get(&key) {
            Some(entry) => now.saturating_duration_since(entry.created) > self.timeout,
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            self.stats.misses += 1;
            tracing::trace!(start = %key.0, goal = %key.1, "Path cache entry expired");
            return None;
        }

        self.stats.hits += 1;
        self.entries.get(&key).map(|entry| entry.path.clone())
    }

    /// Store a result, evicting the oldest entry if over capacity.
    pub fn insert(&mut self, key: PathKey, path: Option<Path>, now: Instant) {
        self.entries.insert(key, CacheEntry { path, created: now });

        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(k, entry)| (entry.created, k.0.row_major(), k.1.row_major()))
                .map(|(k, _)| *k)
            else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            tracing::trace!(start = %oldest.0, goal = %oldest.1, "Path cache evicted oldest entry");
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries (expired ones included until looked up).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Hit/miss/eviction counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: i32) -> PathKey {
        (TilePos::new(0, 0), TilePos::new(n, 0))
    }

    fn path(n: i32) -> Option<Path> {
        Some(Path::from_tiles((0..=n).map(|x| TilePos::new(x, 0)).collect()))
    }

    #[test]
    fn test_hit_within_timeout() {
        let mut cache = PathCache::new(8, Duration::from_secs(5));
        let t0 = Instant::now();
        cache.insert(key(3), path(3), t0);

        assert_eq!(cache.get(key(3), t0 + Duration::from_secs(1)), Some(path(3)));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_failed_search_is_cached() {
        let mut cache = PathCache::new(8, Duration::from_secs(5));
        let t0 = Instant::now();
        cache.insert(key(1), None, t0);

        assert_eq!(cache.get(key(1), t0), Some(None));
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let mut cache = PathCache::new(8, Duration::from_millis(100));
        let t0 = Instant::now();
        cache.insert(key(2), path(2), t0);

        assert_eq!(cache.get(key(2), t0 + Duration::from_millis(101)), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = PathCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert(key(1), path(1), t0);
        cache.insert(key(2), path(2), t0 + Duration::from_millis(1));
        cache.insert(key(3), path(3), t0 + Duration::from_millis(2));

        assert_eq!(cache.len(), 2);
        let now = t0 + Duration::from_millis(3);
        assert_eq!(cache.get(key(1), now), None);
        assert!(cache.get(key(2), now).is_some());
        assert!(cache.get(key(3), now).is_some());
    }

    #[test]
    fn test_reinsert_refreshes_timestamp() {
        let mut cache = PathCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert(key(1), path(1), t0);
        cache.insert(key(2), path(2), t0 + Duration::from_millis(1));
        cache.insert(key(1), path(1), t0 + Duration::from_millis(2));
        cache.insert(key(3), path(3), t0 + Duration::from_millis(3));

        let now = t0 + Duration::from_millis(4);
        assert!(cache.get(key(1), now).is_some());
        assert_eq!(cache.get(key(2), now), None);
    }
}

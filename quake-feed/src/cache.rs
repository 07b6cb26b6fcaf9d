//! Snapshot cache
//!
//! An explicit cache object keyed by feed source id. The engine owns one;
//! tests build isolated instances instead of sharing process-wide state.

use std::sync::Arc;

use dashmap::DashMap;
use quake_core::FeedSnapshot;

/// A stored snapshot with its freshness window
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Epoch milliseconds at storage time
    pub cached_at: i64,
    pub ttl_ms: i64,
    pub snapshot: Arc<FeedSnapshot>,
}

impl CacheEntry {
    /// Fresh while `now - cached_at < ttl_ms`; a non-positive TTL is never fresh
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.is_fresh_within(now_ms, self.ttl_ms)
    }

    /// Freshness against an explicit TTL
    pub fn is_fresh_within(&self, now_ms: i64, ttl_ms: i64) -> bool {
        ttl_ms > 0 && now_ms.saturating_sub(self.cached_at) < ttl_ms
    }
}

/// Snapshot cache keyed by source id
#[derive(Debug, Default)]
pub struct FeedCache {
    entries: DashMap<String, CacheEntry>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for `key` if one is stored and still fresh.
    ///
    /// Freshness is judged against the caller's `ttl_ms`, not the TTL the
    /// entry was stored with, so a caller asking for a shorter window gets
    /// a refetch.
    pub fn get_fresh(&self, key: &str, now_ms: i64, ttl_ms: i64) -> Option<Arc<FeedSnapshot>> {
        let entry = self.entries.get(key)?;
        entry
            .is_fresh_within(now_ms, ttl_ms)
            .then(|| entry.snapshot.clone())
    }

    /// Raw entry lookup, ignoring freshness
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn insert(&self, key: &str, entry: CacheEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cached_at: i64, ttl_ms: i64) -> CacheEntry {
        CacheEntry {
            cached_at,
            ttl_ms,
            snapshot: Arc::new(FeedSnapshot::new(0, "u", "t", Vec::new())),
        }
    }

    #[test]
    fn test_freshness_window() {
        let ttl = 60_000;
        let now = 1_000_000;

        assert!(entry(now - (ttl - 1), ttl).is_fresh(now));
        assert!(!entry(now - ttl, ttl).is_fresh(now));
        assert!(!entry(now - (ttl + 1), ttl).is_fresh(now));
    }

    #[test]
    fn test_non_positive_ttl_never_fresh() {
        assert!(!entry(100, 0).is_fresh(100));
        assert!(!entry(100, -5).is_fresh(50));
    }

    #[test]
    fn test_get_fresh_and_invalidate() {
        let cache = FeedCache::new();
        cache.insert("feed", entry(1_000, 10_000));

        assert!(cache.get_fresh("feed", 5_000, 10_000).is_some());
        assert!(cache.get_fresh("feed", 5_000, 1_000).is_none());
        assert!(cache.get_fresh("other", 5_000, 10_000).is_none());
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get_fresh("feed", 5_000, 10_000).is_none());
    }
}

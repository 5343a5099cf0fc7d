//! Count cache abstraction and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};

/// Trait for cache store implementations.
///
/// Entries are non-negative counts keyed by name. A missing or expired
/// entry is always "unknown", never zero. The TTL is an exact upper
/// bound: an entry must not be readable once its TTL has elapsed, and the
/// backend may evict it earlier at any time.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a cached value, or `None` on a miss.
    async fn get(&self, name: &str) -> Option<u64>;

    /// Write a value with a time-to-live in seconds.
    async fn set(&self, name: &str, value: u64, ttl_seconds: u64);
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: u64,
    expires_at: DateTime<Utc>,
}

/// In-memory cache store with clock-driven expiry.
///
/// Expiry is evaluated against the injected [`Clock`] on every read, so
/// a manual clock makes TTL lapse deterministic in tests.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Create a cache reading time from the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of live entries, expired or not.
    ///
    /// This is primarily useful for testing.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, name: &str) -> Option<u64> {
        let now = self.clock.now();
        let expired = match self.entries.get(name) {
            Some(entry) => {
                if entry.expires_at > now {
                    return Some(entry.value);
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(name);
        }
        None
    }

    async fn set(&self, name: &str, value: u64, ttl_seconds: u64) {
        let expires_at = self.clock.now() + Duration::seconds(ttl_seconds as i64);
        self.entries
            .insert(name.to_string(), CacheEntry { value, expires_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn cache_at(hour: u32) -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 12, hour, 0, 0).unwrap(),
        ));
        (MemoryCache::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _clock) = cache_at(9);
        cache.set("count", 7, 3600).await;
        assert_eq!(cache.get("count").await, Some(7));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_exactly_at_ttl() {
        let (cache, clock) = cache_at(9);
        cache.set("count", 7, 3600).await;

        clock.advance(Duration::seconds(3599));
        assert_eq!(cache.get("count").await, Some(7));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get("count").await, None);
        // The expired entry is dropped, not just hidden
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_immediately_stale() {
        let (cache, _clock) = cache_at(0);
        cache.set("count", 3, 0).await;
        assert_eq!(cache.get("count").await, None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let (cache, clock) = cache_at(9);
        cache.set("count", 1, 10).await;
        cache.set("count", 2, 3600).await;

        clock.advance(Duration::seconds(60));
        assert_eq!(cache.get("count").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear_evicts_everything() {
        let (cache, _clock) = cache_at(9);
        cache.set("count", 1, 3600).await;
        cache.clear();
        assert_eq!(cache.get("count").await, None);
    }
}

//! Time-bounded memoization of discovery results.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// A cached value and the moment it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub data: T,
    /// When the value was fetched
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still within `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Keyed cache whose entries expire after a fixed TTL.
///
/// A fresh entry is served without calling the fetcher. A missing or
/// expired entry calls the fetcher exactly once and stores the result;
/// fetch failures are returned to the caller and never stored.
#[derive(Debug)]
pub struct DiscoveryCache<T> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T: Clone> DiscoveryCache<T> {
    /// Create an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Return the cached value for `key`, fetching it if missing or expired.
    pub async fn get_or_fetch<F, Fut, E>(&mut self, key: &str, fetcher: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(self.ttl) {
                debug!(key, "Discovery cache hit");
                return Ok(entry.data.clone());
            }
        }

        debug!(key, "Discovery cache miss");
        let data = fetcher().await?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data: data.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(data)
    }

    /// Get a fresh cached value without fetching.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| &entry.data)
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    async fn fetch_counting(counter: &AtomicUsize, value: u32) -> Result<u32, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_once_within_ttl() {
        let mut cache = DiscoveryCache::new(TTL);
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_fetch("methods", || fetch_counting(&calls, 1)).await;
        tokio::time::advance(Duration::from_secs(299)).await;
        let second = cache.get_or_fetch("methods", || fetch_counting(&calls, 2)).await;

        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_after_expiry() {
        let mut cache = DiscoveryCache::new(TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("methods", || fetch_counting(&calls, 1)).await.unwrap();
        tokio::time::advance(TTL).await;
        assert!(cache.get("methods").is_none());

        let refreshed = cache.get_or_fetch("methods", || fetch_counting(&calls, 2)).await;
        assert_eq!(refreshed, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The refreshed entry is served again without another call
        let again = cache.get_or_fetch("methods", || fetch_counting(&calls, 3)).await;
        assert_eq!(again, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let mut cache = DiscoveryCache::new(TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("GetOrders", || fetch_counting(&calls, 1)).await.unwrap();
        cache.get_or_fetch("GetClients", || fetch_counting(&calls, 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get("GetOrders"), Some(&1));
        assert_eq!(cache.get("GetClients"), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_not_cached() {
        let mut cache: DiscoveryCache<u32> = DiscoveryCache::new(TTL);

        let failed = cache
            .get_or_fetch("methods", || async { Err::<u32, _>("unreachable".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let calls = AtomicUsize::new(0);
        let ok = cache.get_or_fetch("methods", || fetch_counting(&calls, 7)).await;
        assert_eq!(ok, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_no_fresh_timestamp() {
        let mut cache = DiscoveryCache::new(TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("methods", || fetch_counting(&calls, 1)).await.unwrap();
        tokio::time::advance(TTL).await;

        let failed = cache
            .get_or_fetch("methods", || async { Err::<u32, _>("down".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(cache.get("methods").is_none());

        let retried = cache.get_or_fetch("methods", || fetch_counting(&calls, 5)).await;
        assert_eq!(retried, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_entries() {
        let mut cache = DiscoveryCache::new(TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("a", || fetch_counting(&calls, 1)).await.unwrap();
        cache.get_or_fetch("b", || fetch_counting(&calls, 2)).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        cache.get_or_fetch("a", || fetch_counting(&calls, 3)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

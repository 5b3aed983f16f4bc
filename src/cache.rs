//! TTL cache of resolved addresses.
//!
//! Entries are keyed by exact hostname; the cache knows nothing about
//! wildcard patterns. Only successful resolutions are stored.

use crate::util::normalize_name;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A cached answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The resolved address.
    pub value: String,
    /// Monotonic expiry instant.
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory resolution cache.
///
/// Writes are idempotent overwrites, so concurrent resolutions of the same
/// name at worst query upstream twice.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResolutionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `hostname`, or `None` if absent or expired.
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<String> {
        self.lookup(hostname).map(|(value, _)| value)
    }

    /// Like [`get`](Self::get), also returning the remaining lifetime.
    ///
    /// Expired entries are evicted on the way out.
    #[must_use]
    pub fn lookup(&self, hostname: &str) -> Option<(String, Duration)> {
        let key = normalize_name(hostname);
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.get(key.as_ref())?;
        if !entry.is_expired(now) {
            return Some((entry.value.clone(), entry.expires_at - now));
        }
        entries.remove(key.as_ref());
        tracing::trace!(hostname = %key, "Evicted expired cache entry");
        None
    }

    /// Stores `value` for `ttl_secs` seconds, replacing any existing entry.
    pub fn put(&self, hostname: &str, value: impl Into<String>, ttl_secs: u32) {
        let entry = CacheEntry {
            value: value.into(),
            expires_at: Instant::now() + Duration::from_secs(u64::from(ttl_secs)),
        };
        self.entries
            .lock()
            .insert(normalize_name(hostname).into_owned(), entry);
    }

    /// Drops every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Spawns a task that calls [`purge_expired`](Self::purge_expired) every
    /// `interval`. Must be called from within a Tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn put_then_get_until_ttl() {
        let cache = ResolutionCache::new();
        cache.put("example.owndomain", "192.168.1.100", 300);
        assert_eq!(
            cache.get("example.owndomain").as_deref(),
            Some("192.168.1.100")
        );

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("example.owndomain").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("example.owndomain"), None);
        assert_eq!(cache.get("example.owndomain"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_reports_remaining_ttl() {
        let cache = ResolutionCache::new();
        cache.put("a.priv", "1.2.3.4", 60);
        tokio::time::advance(Duration::from_secs(20)).await;
        let (_, remaining) = cache.lookup("a.priv").unwrap();
        assert_eq!(remaining, Duration::from_secs(40));
    }

    #[test]
    fn put_overwrites() {
        let cache = ResolutionCache::new();
        cache.put("a.priv", "1.1.1.1", 60);
        cache.put("a.priv", "2.2.2.2", 60);
        assert_eq!(cache.get("a.priv").as_deref(), Some("2.2.2.2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_is_never_served() {
        let cache = ResolutionCache::new();
        cache.put("a.priv", "1.1.1.1", 0);
        assert_eq!(cache.get("a.priv"), None);
    }

    #[test]
    fn no_wildcard_lookup() {
        let cache = ResolutionCache::new();
        cache.put("a.owndomain", "1.1.1.1", 60);
        assert_eq!(cache.get("b.owndomain"), None);
        assert_eq!(cache.get("owndomain"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let cache = ResolutionCache::new();
        cache.put("short.priv", "1.1.1.1", 1);
        cache.put("long.priv", "2.2.2.2", 100);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long.priv").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_expired_entries() {
        let cache = Arc::new(ResolutionCache::new());
        cache.put("short.priv", "1.1.1.1", 5);
        cache.put("long.priv", "2.2.2.2", 600);

        let sweeper = cache.spawn_sweeper(Duration::from_secs(60));
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(Duration::from_secs(55)).await;
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long.priv").is_some());
        sweeper.abort();
    }
}

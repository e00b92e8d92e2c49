//! Short-lived result cache
//!
//! A map with a per-entry TTL that memoizes computed aggregates so rapid
//! dashboard refreshes don't recompute them. The cache is an ordinary value
//! owned by whoever constructs it (usually [`AnalyticsService`]); there is no
//! process-wide instance.
//!
//! Concurrent misses for the same key are not deduplicated: two callers may
//! both compute and the later `insert` wins.
//!
//! [`AnalyticsService`]: crate::service::AnalyticsService

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default time-to-live for cached results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Key → value store with a fixed TTL per entry.
pub struct ResultCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, if present and not expired.
    ///
    /// Expired entries are removed on read.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Store `value`, replacing any previous entry and restarting its TTL.
    pub fn insert(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.ttl;
        self.lock().insert(key, Entry { value, expires_at });
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop every entry matching `predicate`.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K, V> Default for ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_inserted_value() {
        let cache: ResultCache<String, u32> = ResultCache::default();
        assert!(cache.get(&"a".to_string()).is_none());

        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entries_expire() {
        let cache: ResultCache<&str, u32> = ResultCache::new(Duration::from_millis(20));
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get(&"a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache: ResultCache<&str, u32> = ResultCache::new(Duration::ZERO);
        cache.insert("a", 1);
        assert!(cache.get(&"a").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let cache: ResultCache<&str, u32> = ResultCache::default();
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(cache.get(&"a"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_purge() {
        let cache: ResultCache<(&str, u8), u32> = ResultCache::new(Duration::from_millis(20));
        cache.insert(("site-a", 0), 1);
        cache.insert(("site-a", 1), 2);
        cache.insert(("site-b", 0), 3);

        assert!(cache.invalidate(&("site-b", 0)));
        assert!(!cache.invalidate(&("site-b", 0)));
        assert_eq!(cache.invalidate_where(|(site, _)| *site == "site-a"), 2);
        assert!(cache.is_empty());

        cache.insert(("site-c", 0), 4);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.purge_expired(), 1);
    }
}

use std::collections::HashMap;
use std::time::Duration;

use nounbase_core::CacheOptions;
use parking_lot::Mutex;
use tracing::debug;

use crate::entry::CacheEntry;
use crate::stats::CacheStats;

/// LRU + TTL cache keyed by string.
///
/// - `get` misses on absent or stale keys (stale entries are dropped) and
///   bumps the entry's access order on a hit.
/// - `set` evicts the least recently used entry when full and `key` is new.
/// - Disabled caches always miss and ignore `set`.
pub struct QueryCache<V> {
    max_size: usize,
    ttl: Option<Duration>,
    inner: Mutex<Inner<V>>,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Monotonic access counter for LRU ordering.
    clock: u64,
    enabled: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> Inner<V> {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.access_order)
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
            debug!(key = %key, "cache evicted lru entry");
        }
    }
}

impl<V: Clone> QueryCache<V> {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            max_size: options.max_size,
            ttl: options.ttl(),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
                enabled: options.enabled,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        if !inner.enabled {
            inner.misses += 1;
            return None;
        }
        let expired = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(self.ttl),
        };
        if expired {
            inner.entries.remove(key);
            inner.expirations += 1;
            inner.misses += 1;
            debug!(key = %key, "cache entry expired");
            return None;
        }
        let order = inner.tick();
        inner.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.access_order = order;
        Some(entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut inner = self.inner.lock();
        if !inner.enabled || self.max_size == 0 {
            return;
        }
        let key = key.into();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            inner.evict_lru();
        }
        let order = inner.tick();
        inner.entries.insert(key, CacheEntry::new(value, order));
    }

    /// Whether a live entry exists. Does not touch LRU order or counters.
    pub fn has(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        inner.enabled
            && inner
                .entries
                .get(key)
                .is_some_and(|e| !e.is_expired(self.ttl))
    }

    /// Read-through: return the cached value or load, cache and return it.
    ///
    /// The loader runs without the cache lock held. `None` results are not
    /// cached.
    pub fn get_or_insert_with<E, F>(&self, key: &str, load: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }
        let loaded = load()?;
        if let Some(value) = &loaded {
            self.set(key, value.clone());
        }
        Ok(loaded)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Remove every listed key. Returns how many were present.
    pub fn invalidate_many<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.inner.lock();
        keys.into_iter()
            .filter(|k| inner.entries.remove(k.as_ref()).is_some())
            .count()
    }

    /// Remove every entry matching the predicate. Returns how many were removed.
    pub fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&str, &V) -> bool,
    {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|k, e| !predicate(k, &e.value));
        before - inner.entries.len()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Turning the cache off also clears it.
    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        inner.enabled = enabled;
        if !enabled {
            inner.entries.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            ttl_ms: self.ttl.map_or(0, |t| t.as_millis() as u64),
            enabled: inner.enabled,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn cache(max_size: usize, ttl_ms: u64) -> QueryCache<String> {
        QueryCache::new(CacheOptions { max_size, ttl_ms, enabled: true })
    }

    // ========================================================================
    // Basic get/set
    // ========================================================================

    #[test]
    fn set_then_get() {
        let c = cache(10, 0);
        c.set("k", "v".to_string());
        assert_eq!(c.get("k"), Some("v".to_string()));
        assert!(c.has("k"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn missing_key_misses() {
        let c = cache(10, 0);
        assert_eq!(c.get("nope"), None);
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn overwrite_replaces_value() {
        let c = cache(10, 0);
        c.set("k", "a".to_string());
        c.set("k", "b".to_string());
        assert_eq!(c.get("k"), Some("b".to_string()));
        assert_eq!(c.len(), 1);
    }

    // ========================================================================
    // LRU
    // ========================================================================

    #[test]
    fn lru_evicts_oldest_insert() {
        let c = cache(2, 0);
        c.set("a", "1".to_string());
        c.set("b", "2".to_string());
        c.set("c", "3".to_string());

        assert!(!c.has("a"));
        assert!(c.has("b"));
        assert!(c.has("c"));
        assert_eq!(c.stats().evictions, 1);
    }

    #[test]
    fn read_protects_from_eviction() {
        let c = cache(2, 0);
        c.set("a", "1".to_string());
        c.set("b", "2".to_string());
        assert!(c.get("a").is_some());
        c.set("c", "3".to_string());

        assert!(c.has("a"));
        assert!(!c.has("b"));
    }

    #[test]
    fn overwrite_at_capacity_does_not_evict() {
        let c = cache(2, 0);
        c.set("a", "1".to_string());
        c.set("b", "2".to_string());
        c.set("a", "1b".to_string());
        assert_eq!(c.len(), 2);
        assert_eq!(c.stats().evictions, 0);
    }

    #[test]
    fn zero_capacity_caches_nothing() {
        let c = cache(0, 0);
        c.set("a", "1".to_string());
        assert!(c.is_empty());
    }

    // ========================================================================
    // TTL
    // ========================================================================

    #[test]
    fn ttl_expires_entries() {
        let c = cache(10, 50);
        c.set("x", "v".to_string());
        assert!(c.get("x").is_some());
        sleep(Duration::from_millis(60));
        assert_eq!(c.get("x"), None);
        assert_eq!(c.len(), 0);
        assert_eq!(c.stats().expirations, 1);
    }

    #[test]
    fn zero_ttl_never_expires() {
        let c = cache(10, 0);
        c.set("x", "v".to_string());
        sleep(Duration::from_millis(20));
        assert!(c.get("x").is_some());
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    #[test]
    fn invalidate_variants() {
        let c = cache(10, 0);
        for k in ["User:1", "User:2", "Post:1", "Post:2"] {
            c.set(k, k.to_lowercase());
        }

        assert!(c.invalidate("User:1"));
        assert!(!c.invalidate("User:1"));
        assert_eq!(c.invalidate_many(["User:2", "Nope:1"]), 1);
        assert_eq!(c.invalidate_where(|k, _| k.starts_with("Post:")), 2);
        assert!(c.is_empty());
    }

    #[test]
    fn invalidate_where_sees_values() {
        let c = cache(10, 0);
        c.set("a", "keep".to_string());
        c.set("b", "drop".to_string());
        assert_eq!(c.invalidate_where(|_, v| v == "drop"), 1);
        assert!(c.has("a"));
    }

    #[test]
    fn clear_empties() {
        let c = cache(10, 0);
        c.set("a", "1".to_string());
        c.clear();
        assert!(c.is_empty());
    }

    // ========================================================================
    // Enabled flag
    // ========================================================================

    #[test]
    fn disabled_cache_misses_and_ignores_set() {
        let c: QueryCache<String> =
            QueryCache::new(CacheOptions { enabled: false, ..Default::default() });
        c.set("a", "1".to_string());
        assert_eq!(c.get("a"), None);
        assert!(c.is_empty());
    }

    #[test]
    fn set_enabled_false_clears() {
        let c = cache(10, 0);
        c.set("a", "1".to_string());
        c.set_enabled(false);
        assert!(c.is_empty());
        assert!(!c.is_enabled());
        c.set_enabled(true);
        c.set("a", "1".to_string());
        assert!(c.has("a"));
    }

    // ========================================================================
    // Read-through + stats
    // ========================================================================

    #[test]
    fn get_or_insert_with_loads_once() {
        let c = cache(10, 0);
        let mut calls = 0;
        for _ in 0..3 {
            let v: Result<Option<String>, ()> = c.get_or_insert_with("k", || {
                calls += 1;
                Ok(Some("loaded".to_string()))
            });
            assert_eq!(v.unwrap().as_deref(), Some("loaded"));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn get_or_insert_with_does_not_cache_none_or_errors() {
        let c = cache(10, 0);
        let none: Result<Option<String>, ()> = c.get_or_insert_with("k", || Ok(None));
        assert_eq!(none, Ok(None));
        let err: Result<Option<String>, &str> = c.get_or_insert_with("k", || Err("boom"));
        assert_eq!(err, Err("boom"));
        assert!(c.is_empty());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let c = cache(5, 1000);
        c.set("a", "1".to_string());
        c.get("a");
        c.get("a");
        c.get("b");
        let s = c.stats();
        assert_eq!(s.hits, 2);
        assert_eq!(s.misses, 1);
        assert_eq!(s.size, 1);
        assert_eq!(s.max_size, 5);
        assert_eq!(s.ttl_ms, 1000);
        assert!(s.enabled);
    }

    #[test]
    fn cache_key_convention() {
        assert_eq!(crate::cache_key("User", "u1"), "User:u1");
    }
}

use std::time::{Duration, Instant};

/// A cached value with its creation instant (TTL) and last access order (LRU).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    /// Monotonic counter value from the entry's most recent `get` or `set`.
    pub access_order: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, access_order: u64) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            access_order,
        }
    }

    /// Whether the entry has outlived `ttl`. `None` never expires.
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.created_at.elapsed() > ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ttl_never_expires() {
        let e = CacheEntry::new(1, 0);
        assert!(!e.is_expired(None));
    }

    #[test]
    fn expires_after_ttl() {
        let mut e = CacheEntry::new(1, 0);
        assert!(!e.is_expired(Some(Duration::from_secs(60))));
        e.created_at = Instant::now() - Duration::from_millis(20);
        assert!(e.is_expired(Some(Duration::from_millis(10))));
    }
}

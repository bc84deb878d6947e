//! Query cache: a capacity- and TTL-bounded key -> value cache.
//!
//! The cache never watches a store. Callers compose it around an accessor's
//! `get` and invalidate after their own `update`/`delete`:
//!
//! ```ignore
//! let cache = QueryCache::new(CacheOptions::default());
//! let key = cache_key("User", id);
//! let user = cache.get_or_insert_with(&key, || users.get(id))?;
//! users.update(id, patch)?;
//! cache.invalidate(&key);
//! ```

mod entry;
mod stats;
mod store;

pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::QueryCache;

/// Conventional key for caches shared across nouns: `noun:id`.
pub fn cache_key(noun: &str, id: &str) -> String {
    format!("{}:{}", noun, id)
}

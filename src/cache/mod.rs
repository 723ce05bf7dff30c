//! Cache Module
//!
//! Provides a bounded in-memory cache with LRU eviction.

mod entry;
mod lru;
mod stats;


use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruCache;
pub use stats::CacheStats;

// == Cache Trait ==
/// Key/value cache capability.
///
/// A miss from [`Cache::get`] is reported as
/// [`Error::NotFound`](crate::error::Error::NotFound) and is not a fault.
pub trait Cache<K, V> {
    /// Reports whether `key` is present without touching recency.
    fn has(&self, key: &K) -> bool;

    /// Returns the value for `key`, marking it most recently used.
    fn get(&mut self, key: &K) -> Result<&V>;

    /// Inserts or replaces the value for `key`.
    fn put(&mut self, key: K, value: V);
}

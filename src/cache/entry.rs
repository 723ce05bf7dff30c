//! Cache Entry Module
//!
//! Defines the pooled slot that backs every cache entry.

// == Cache Entry ==
/// A single slot of the cache pool.
///
/// Links are pool indices rather than references. A slot is either live
/// (`item` is `Some` and it sits on the recency list) or free (`item` is
/// `None` and `next` points at the next free slot).
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// Stored key and value, `None` while the slot is free
    pub item: Option<(K, V)>,
    /// Neighbour closer to the head (more recently used)
    pub prev: Option<usize>,
    /// Neighbour closer to the tail, or next free slot
    pub next: Option<usize>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates an unused slot linked to the given next free slot.
    pub fn free(next: Option<usize>) -> Self {
        Self {
            item: None,
            prev: None,
            next,
        }
    }

    // == Is Free ==
    /// Returns true if the slot holds no item.
    pub fn is_free(&self) -> bool {
        self.item.is_none()
    }

    // == Key ==
    pub fn key(&self) -> Option<&K> {
        self.item.as_ref().map(|(k, _)| k)
    }

    // == Value ==
    pub fn value(&self) -> Option<&V> {
        self.item.as_ref().map(|(_, v)| v)
    }
}

// == Pool Allocation ==
/// Allocates a pool of `capacity` free slots chained into a free list.
///
/// Slot `i` links to slot `i + 1`; the last slot terminates the list.
pub fn allocate_pool<K, V>(capacity: usize) -> Vec<CacheEntry<K, V>> {
    (0..capacity)
        .map(|i| {
            let next = if i + 1 < capacity { Some(i + 1) } else { None };
            CacheEntry::free(next)
        })
        .collect()
}

//! LRU Cache Module
//!
//! Bounded least-recently-used cache over a fixed pool of slots.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::entry::{allocate_pool, CacheEntry};
use crate::cache::{Cache, CacheStats};
use crate::error::{Error, Result};

// == LRU Cache ==
/// Bounded cache evicting the least recently used entry when full.
///
/// All slots are allocated once by [`LruCache::new`]. Unused slots form a
/// free list; live slots form a doubly-linked recency list threaded
/// through the pool by index:
/// - Head = most recently used
/// - Tail = next eviction candidate
///
/// # Usage contract
/// The cache does no internal locking. `get` reorders the recency list, so
/// even reads need `&mut self`. Share an instance between threads only
/// behind a caller-owned lock (for example `tokio::sync::Mutex`).
#[derive(Debug)]
pub struct LruCache<K, V> {
    /// Slot pool, never resized after construction
    entries: Vec<CacheEntry<K, V>>,
    /// Key to slot index, exactly the live slots
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    /// First unused slot
    free: Option<usize>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// Fails with [`Error::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(Self {
            entries: allocate_pool(capacity),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            free: Some(0),
            stats: CacheStats::new(),
        })
    }

    // == Has ==
    /// Reports whether `key` is cached. Does not change recency.
    pub fn has(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    ///
    /// A miss yields [`Error::NotFound`], which callers are expected to
    /// handle as ordinary control flow.
    pub fn get(&mut self, key: &K) -> Result<&V> {
        let Some(&idx) = self.index.get(key) else {
            self.stats.record_miss();
            return Err(Error::NotFound);
        };
        self.stats.record_hit();
        self.promote(idx);
        self.entries[idx].value().ok_or(Error::NotFound)
    }

    // == Put ==
    /// Inserts or updates `key`, making it the most recently used entry.
    ///
    /// When the cache is full the tail slot is repurposed: its old key is
    /// dropped from the index and the slot takes the new pair.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            if let Some((_, stored)) = self.entries[idx].item.as_mut() {
                *stored = value;
            }
            self.promote(idx);
            return;
        }

        let idx = if let Some(idx) = self.free {
            self.free = self.entries[idx].next;
            self.entries[idx].next = None;
            idx
        } else if let Some(idx) = self.tail {
            if let Some((evicted, _)) = self.entries[idx].item.take() {
                self.index.remove(&evicted);
                self.stats.record_eviction();
            }
            idx
        } else {
            // Capacity is at least one, so either a free slot or a tail exists.
            return;
        };

        self.entries[idx].item = Some((key.clone(), value));
        self.index.insert(key, idx);
        self.promote(idx);
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Capacity ==
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    // == Iterate ==
    /// Iterates live entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let idx = cursor?;
            let entry = &self.entries[idx];
            cursor = entry.next;
            entry.item.as_ref().map(|(k, v)| (k, v))
        })
    }

    // == Promote ==
    /// Moves a slot to the head of the recency list in O(1).
    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.entries[idx].prev;
        let next = self.entries[idx].next;

        match prev {
            Some(p) => self.entries[p].next = next,
            None if self.head == Some(idx) => self.head = next,
            None => {}
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None if self.tail == Some(idx) => self.tail = prev,
            None => {}
        }

        self.entries[idx].prev = None;
        self.entries[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.entries[idx].prev = None;
        self.entries[idx].next = self.head;
        if let Some(h) = self.head {
            self.entries[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    // == Invariant Check ==
    /// Panics if the pool, index and recency list disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut live = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let entry = &self.entries[idx];
            assert_eq!(entry.prev, prev, "broken prev link at slot {}", idx);
            let key = entry.key().expect("free slot on recency list");
            assert_eq!(self.index.get(key), Some(&idx), "index disagrees at slot {}", idx);
            live += 1;
            prev = Some(idx);
            cursor = entry.next;
        }
        assert_eq!(self.tail, prev, "tail is not the last list element");
        assert_eq!(live, self.index.len(), "index has unreachable keys");

        let mut free = 0;
        let mut cursor = self.free;
        while let Some(idx) = cursor {
            assert!(self.entries[idx].is_free(), "live slot on free list");
            free += 1;
            cursor = self.entries[idx].next;
        }
        assert_eq!(live + free, self.capacity(), "slots leaked from the pool");
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn has(&self, key: &K) -> bool {
        LruCache::has(self, key)
    }

    fn get(&mut self, key: &K) -> Result<&V> {
        LruCache::get(self, key)
    }

    fn put(&mut self, key: K, value: V) {
        LruCache::put(self, key, value)
    }
}

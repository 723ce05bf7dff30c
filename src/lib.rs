//! Sync Cache - exclusive write locks and caching building blocks
//!
//! Provides in-process and lease-based write-lock synchronisers, a bounded
//! LRU cache, and byte-range data providers with metadata records.

pub mod cache;
pub mod config;
pub mod datastore;
pub mod error;
pub mod sync;
pub mod tasks;

pub use cache::{Cache, LruCache};
pub use config::Config;
pub use error::{Error, Result};
pub use sync::{LocalSynchroniser, NetworkedSynchroniser, Synchroniser, WriteLock};

//! Synchroniser Module
//!
//! Write-lock synchronisers sharing one contract:
//! - [`LocalSynchroniser`]: in-process lock table
//! - [`NetworkedSynchroniser`]: leases in a shared key-value store, renewed
//!   in the background until released
//!
//! A contended lock fails immediately with
//! [`Error::LockAlreadyHeld`]; there is no waiting or queueing.

mod backend;
mod lease;
mod local;
mod networked;
mod options;
mod signal;

use std::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};

// Re-export public types
pub use backend::{LeaseBackend, MemoryLeaseBackend, RedisBackend};
pub use lease::LeaseLock;
pub use local::{LocalSynchroniser, LocalWriteLock};
pub use networked::NetworkedSynchroniser;
pub use options::{SynchroniserOption, SynchroniserOptions, DEFAULT_LOCK_TIMEOUT_SECS};
pub use signal::{ReleaseNotifier, UnlockSignal};

// == Public Constants ==
/// Minimum lock identifier length accepted by the networked synchroniser
pub const MIN_LEASE_LOCK_ID_LEN: usize = 3;

// == Synchroniser Trait ==
/// Issues exclusive write locks by identifier.
#[async_trait]
pub trait Synchroniser: Send + Sync {
    /// Acquires the write lock for `lock_id` or fails without waiting.
    ///
    /// # Errors
    /// - [`Error::InvalidLockId`] for an empty or whitespace-only identifier
    /// - [`Error::LockAlreadyHeld`] if another handle holds the lock
    /// - backend errors from networked implementations
    async fn get_write_lock(&self, lock_id: &str) -> Result<Box<dyn WriteLock>>;
}

// == Write Lock Trait ==
/// Handle to an acquired write lock.
///
/// Status moves from held to released exactly once.
#[async_trait]
pub trait WriteLock: Send + Sync + fmt::Debug {
    /// Identifier the lock was acquired for.
    fn lock_id(&self) -> &str;

    /// Releases the lock. Calling it again after release succeeds without
    /// effect.
    async fn unlock(&self) -> Result<()>;

    /// Non-blocking check of the release signal.
    fn is_unlocked(&self) -> bool;

    /// Returns a waiter that completes once the lock is released.
    fn wait_unlocked(&self) -> UnlockSignal;
}

// == Validation ==
/// Rejects empty and whitespace-only identifiers.
pub(crate) fn validate_lock_id(lock_id: &str) -> Result<()> {
    if lock_id.trim().is_empty() {
        return Err(Error::InvalidLockId);
    }
    Ok(())
}

/// Identifier rules for leases: non-blank and at least three bytes long.
pub(crate) fn validate_lease_lock_id(lock_id: &str) -> Result<()> {
    validate_lock_id(lock_id)?;
    if lock_id.len() < MIN_LEASE_LOCK_ID_LEN {
        return Err(Error::InvalidLockId);
    }
    Ok(())
}

/// Backend key holding the lease for `lock_id`.
pub fn lease_key(lock_id: &str) -> String {
    format!("lock:{}:write", lock_id)
}

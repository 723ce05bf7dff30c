//! Lease Lock Module
//!
//! A write lock held as a renewable lease in a shared backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::sync::{
    lease_key, validate_lease_lock_id, LeaseBackend, ReleaseNotifier, UnlockSignal, WriteLock,
};
use crate::tasks::{spawn_renewal_task, RenewalHandle};

// == Lease Lock ==
/// Write lock backed by a lease in a [`LeaseBackend`].
///
/// While held, a background task refreshes the lease every `ttl / 2`.
/// [`LeaseLock::unlock`] stops that task, deletes the lease if this lock
/// still owns it and fires the release signal before returning.
///
/// Dropping the handle without unlocking stops renewal but leaves the key
/// in place; it expires after `ttl` and the release signal never fires.
#[derive(Debug)]
pub struct LeaseLock {
    lock_id: String,
    key: String,
    token: String,
    ttl: Duration,
    renewal: Mutex<Option<RenewalHandle>>,
    released: Arc<ReleaseNotifier>,
}

impl LeaseLock {
    // == Acquire ==
    /// Takes the lease for `lock_id` under `token`, then starts renewal.
    ///
    /// Validation runs before any backend call.
    ///
    /// # Errors
    /// - [`Error::InvalidLockId`] for blank or shorter than three bytes
    /// - [`Error::InvalidOption`] for an empty token or zero TTL
    /// - [`Error::LockAlreadyHeld`] if another token holds the lease
    /// - backend errors, unchanged
    pub async fn acquire(
        backend: Arc<dyn LeaseBackend>,
        lock_id: &str,
        token: String,
        ttl: Duration,
    ) -> Result<Self> {
        validate_lease_lock_id(lock_id)?;
        if token.is_empty() {
            return Err(Error::InvalidOption("lock token cannot be empty".to_string()));
        }
        if ttl.is_zero() {
            return Err(Error::InvalidOption("lease ttl must be positive".to_string()));
        }

        let key = lease_key(lock_id);
        if !backend.acquire(&key, &token, ttl).await? {
            return Err(Error::LockAlreadyHeld(lock_id.to_string()));
        }
        info!(lock_id, key = %key, ?ttl, "lease acquired");

        let released = Arc::new(ReleaseNotifier::new());
        let renewal = spawn_renewal_task(
            backend,
            key.clone(),
            token.clone(),
            ttl,
            Arc::clone(&released),
        );

        Ok(Self {
            lock_id: lock_id.to_string(),
            key,
            token,
            ttl,
            renewal: Mutex::new(Some(renewal)),
            released,
        })
    }

    // == Unlock ==
    /// Releases the lease and waits for full teardown.
    ///
    /// Only the first call drives the release and sees its result;
    /// concurrent or later calls wait for the release signal and succeed.
    pub async fn unlock(&self) -> Result<()> {
        let renewal = self.renewal.lock().await.take();
        match renewal {
            Some(renewal) => renewal.stop().await,
            None => {
                self.released.subscribe().wait().await;
                Ok(())
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Owner token minted for this acquisition.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl WriteLock for LeaseLock {
    fn lock_id(&self) -> &str {
        &self.lock_id
    }

    async fn unlock(&self) -> Result<()> {
        LeaseLock::unlock(self).await
    }

    fn is_unlocked(&self) -> bool {
        self.released.is_fired()
    }

    fn wait_unlocked(&self) -> UnlockSignal {
        self.released.subscribe()
    }
}

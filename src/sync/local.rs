//! Local Synchroniser Module
//!
//! In-process write locks backed by a table guarded by one mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sync::{validate_lock_id, ReleaseNotifier, Synchroniser, UnlockSignal, WriteLock};

/// Lock identifier to the owner token of the live record.
type LockTable = Arc<Mutex<HashMap<String, Uuid>>>;

// == Local Synchroniser ==
/// In-process synchroniser.
///
/// Each instance owns its own table. Clones share the table, so clones
/// exclude each other while separate instances do not.
#[derive(Debug, Clone, Default)]
pub struct LocalSynchroniser {
    locks: LockTable,
}

impl LocalSynchroniser {
    pub fn new() -> Self {
        Self::default()
    }

    // == Acquire ==
    /// Acquires the write lock for `lock_id`.
    ///
    /// The check and the insert happen under one table lock.
    pub async fn acquire(&self, lock_id: &str) -> Result<LocalWriteLock> {
        validate_lock_id(lock_id)?;

        let mut locks = self.locks.lock().await;
        if locks.contains_key(lock_id) {
            return Err(Error::LockAlreadyHeld(lock_id.to_string()));
        }
        let token = Uuid::new_v4();
        locks.insert(lock_id.to_string(), token);
        debug!(lock_id, "local write lock acquired");

        Ok(LocalWriteLock {
            lock_id: lock_id.to_string(),
            token,
            locks: Arc::clone(&self.locks),
            released: ReleaseNotifier::new(),
        })
    }

    // == Held Count ==
    /// Returns the number of locks currently held.
    pub async fn held_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[async_trait]
impl Synchroniser for LocalSynchroniser {
    async fn get_write_lock(&self, lock_id: &str) -> Result<Box<dyn WriteLock>> {
        Ok(Box::new(self.acquire(lock_id).await?))
    }
}

// == Local Write Lock ==
/// Handle to a lock held in a [`LocalSynchroniser`] table.
///
/// There is no lease: the lock stays held until [`LocalWriteLock::unlock`]
/// is called.
#[derive(Debug)]
pub struct LocalWriteLock {
    lock_id: String,
    token: Uuid,
    locks: LockTable,
    released: ReleaseNotifier,
}

impl LocalWriteLock {
    // == Unlock ==
    /// Removes the lock from the table and fires the release signal.
    ///
    /// Succeeds without effect if this handle was already released. Fails
    /// if the table no longer holds this handle's record.
    pub async fn unlock(&self) -> Result<()> {
        let mut locks = self.locks.lock().await;
        if self.released.is_fired() {
            return Ok(());
        }
        match locks.get(&self.lock_id) {
            None => return Err(Error::LockNotHeld(self.lock_id.clone())),
            Some(token) if *token != self.token => {
                return Err(Error::LockMismatch(self.lock_id.clone()))
            }
            Some(_) => {}
        }
        locks.remove(&self.lock_id);
        self.released.fire();
        debug!(lock_id = %self.lock_id, "local write lock released");
        Ok(())
    }
}

#[async_trait]
impl WriteLock for LocalWriteLock {
    fn lock_id(&self) -> &str {
        &self.lock_id
    }

    async fn unlock(&self) -> Result<()> {
        LocalWriteLock::unlock(self).await
    }

    fn is_unlocked(&self) -> bool {
        self.released.is_fired()
    }

    fn wait_unlocked(&self) -> UnlockSignal {
        self.released.subscribe()
    }
}

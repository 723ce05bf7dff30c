//! Networked Synchroniser Module
//!
//! Issues lease locks against a backend shared by many processes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::sync::{
    validate_lease_lock_id, LeaseBackend, LeaseLock, RedisBackend, Synchroniser,
    SynchroniserOption, SynchroniserOptions, WriteLock, DEFAULT_LOCK_TIMEOUT_SECS,
};

// == Networked Synchroniser ==
/// Synchroniser whose locks are leases in a shared backend.
///
/// Every acquisition mints a fresh owner token, so two acquisitions never
/// share ownership even for the same identifier in the same process.
#[derive(Debug, Clone)]
pub struct NetworkedSynchroniser {
    backend: Arc<dyn LeaseBackend>,
    lease_ttl: Duration,
}

impl NetworkedSynchroniser {
    // == Connect ==
    /// Builds a synchroniser on a Redis server.
    ///
    /// Options are validated first; the server must answer a ping before
    /// this returns.
    ///
    /// # Example
    /// ```ignore
    /// let sync = NetworkedSynchroniser::connect([
    ///     SynchroniserOption::Dsn("127.0.0.1:6379".to_string()),
    ///     SynchroniserOption::LockTimeout(10),
    /// ])
    /// .await?;
    /// let lock = sync.acquire("reports").await?;
    /// ```
    pub async fn connect<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = SynchroniserOption>,
    {
        let opts = SynchroniserOptions::from_options(options)?;
        Self::connect_with(&opts).await
    }

    /// Builds a synchroniser from already resolved options.
    pub async fn connect_with(opts: &SynchroniserOptions) -> Result<Self> {
        let backend = RedisBackend::connect(opts).await?;
        Ok(Self::with_backend(Arc::new(backend), opts.lock_timeout()))
    }

    // == With Backend ==
    /// Builds a synchroniser on any lease backend. A zero TTL selects the
    /// default lease timeout.
    pub fn with_backend(backend: Arc<dyn LeaseBackend>, lease_ttl: Duration) -> Self {
        let lease_ttl = if lease_ttl.is_zero() {
            Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS)
        } else {
            lease_ttl
        };
        Self { backend, lease_ttl }
    }

    // == Acquire ==
    /// Acquires the lease lock for `lock_id` under a new owner token.
    pub async fn acquire(&self, lock_id: &str) -> Result<LeaseLock> {
        validate_lease_lock_id(lock_id)?;
        let token = Uuid::new_v4().to_string();
        LeaseLock::acquire(Arc::clone(&self.backend), lock_id, token, self.lease_ttl).await
    }

    pub fn lease_ttl(&self) -> Duration {
        self.lease_ttl
    }
}

#[async_trait]
impl Synchroniser for NetworkedSynchroniser {
    async fn get_write_lock(&self, lock_id: &str) -> Result<Box<dyn WriteLock>> {
        Ok(Box::new(self.acquire(lock_id).await?))
    }
}

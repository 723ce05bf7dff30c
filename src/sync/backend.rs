//! Lease Backend Module
//!
//! Shared key-value stores holding lease records. Every operation is a
//! single atomic step evaluated by the store.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::sync::SynchroniserOptions;

// == Lease Backend Trait ==
/// Store capable of conditional set and compare-and-delete on one key.
#[async_trait]
pub trait LeaseBackend: Send + Sync + fmt::Debug {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Sets `key` to `token` with `ttl` if absent, or refreshes the TTL if
    /// `key` already holds `token`.
    ///
    /// Returns false if another token holds the key.
    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool>;

    /// Deletes `key` only if it still holds `token`.
    ///
    /// Returns false if the key was absent or held by another token.
    async fn release(&self, key: &str, token: &str) -> Result<bool>;
}

// == Redis Scripts ==
/// KEYS[1] = lease key, ARGV[1] = owner token, ARGV[2] = TTL in milliseconds
const ACQUIRE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    redis.call("SET", KEYS[1], ARGV[1], "PX", ARGV[2])
    return "OK"
else
    return redis.call("SET", KEYS[1], ARGV[1], "NX", "PX", ARGV[2])
end
"#;

/// KEYS[1] = lease key, ARGV[1] = owner token
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

// == Redis Backend ==
/// Lease store on a Redis server, using Lua scripts for atomicity.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    acquire_script: Script,
    release_script: Script,
    address: String,
}

impl RedisBackend {
    // == Connect ==
    /// Opens a managed connection and pings the server.
    pub async fn connect(options: &SynchroniserOptions) -> Result<Self> {
        let client = redis::Client::open(options.connection_info()?)?;
        let conn = client.get_connection_manager().await?;
        let backend = Self {
            conn,
            acquire_script: Script::new(ACQUIRE_SCRIPT),
            release_script: Script::new(RELEASE_SCRIPT),
            address: options.dsn.clone(),
        };
        backend.ping().await?;
        debug!(address = %backend.address, "connected to redis lease backend");
        Ok(backend)
    }
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LeaseBackend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: redis::Value = self
            .acquire_script
            .key(key)
            .arg(token)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(!matches!(reply, redis::Value::Nil))
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}

// == Memory Lease Backend ==
#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: Instant,
}

/// In-process lease store with the same semantics as [`RedisBackend`].
///
/// Clones share state, so several synchronisers built on clones of one
/// backend exclude each other as if they shared a server. Expiry follows
/// the tokio clock.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseBackend {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
    operations: Arc<AtomicUsize>,
}

impl MemoryLeaseBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of acquire/release calls served so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Number of lease records stored, including expired ones not yet pruned.
    pub async fn lease_count(&self) -> usize {
        self.leases.lock().await.len()
    }

    /// Token of the live (unexpired) lease on `key`.
    pub async fn holder(&self, key: &str) -> Option<String> {
        let leases = self.leases.lock().await;
        leases
            .get(key)
            .filter(|lease| lease.expires_at > Instant::now())
            .map(|lease| lease.token.clone())
    }
}

#[async_trait]
impl LeaseBackend for MemoryLeaseBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        leases.retain(|_, lease| lease.expires_at > now);
        match leases.get_mut(key) {
            Some(lease) if lease.token != token => Ok(false),
            Some(lease) => {
                lease.token = token.to_string();
                lease.expires_at = now + ttl;
                Ok(true)
            }
            None => {
                leases.insert(
                    key.to_string(),
                    Lease {
                        token: token.to_string(),
                        expires_at: now + ttl,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        match leases.get(key) {
            Some(lease) if lease.expires_at <= now => {
                leases.remove(key);
                Ok(false)
            }
            Some(lease) if lease.token == token => {
                leases.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

//! Configuration Module
//!
//! Handles loading synchroniser configuration from environment variables.

use std::env;

use crate::sync::{SynchroniserOption, DEFAULT_LOCK_TIMEOUT_SECS};

/// Lease backend configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis address as `host:port`
    pub redis_dsn: String,
    /// Redis password, unset for none
    pub redis_password: Option<String>,
    /// Redis database index
    pub redis_db: i64,
    /// Lease timeout in seconds
    pub lock_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_DSN` - Redis address (default: 127.0.0.1:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none; empty means none)
    /// - `REDIS_DB` - Database index (default: 0)
    /// - `LOCK_TIMEOUT` - Lease timeout in seconds (default: 6)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_dsn: env::var("REDIS_DSN")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.redis_dsn),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
            redis_db: env::var("REDIS_DB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.redis_db),
            lock_timeout: env::var("LOCK_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lock_timeout),
        }
    }

    /// Converts the configuration into synchroniser options.
    pub fn synchroniser_options(&self) -> Vec<SynchroniserOption> {
        let mut options = vec![
            SynchroniserOption::Dsn(self.redis_dsn.clone()),
            SynchroniserOption::Db(self.redis_db),
            SynchroniserOption::LockTimeout(self.lock_timeout),
        ];
        if let Some(password) = &self.redis_password {
            options.push(SynchroniserOption::Password(password.clone()));
        }
        options
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_dsn: "127.0.0.1:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            lock_timeout: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }
}

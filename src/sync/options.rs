//! Synchroniser Options Module
//!
//! Named construction options for the networked synchroniser.

use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use crate::error::{Error, Result};

/// Lease timeout applied when none (or zero) is configured
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 6;

/// Port used when the address names only a host
const DEFAULT_REDIS_PORT: u16 = 6379;

// == Synchroniser Option ==
/// A single named option, validated when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynchroniserOption {
    /// Backend address as `host:port`; must not be empty
    Dsn(String),
    /// Backend password; must not be empty
    Password(String),
    /// Database index
    Db(i64),
    /// Lease timeout in seconds; zero selects the default
    LockTimeout(u64),
}

impl SynchroniserOption {
    // == Apply ==
    /// Validates the option and writes it into `opts`.
    pub fn apply(self, opts: &mut SynchroniserOptions) -> Result<()> {
        match self {
            SynchroniserOption::Dsn(dsn) => {
                if dsn.trim().is_empty() {
                    return Err(Error::InvalidOption("dsn cannot be empty".to_string()));
                }
                opts.dsn = dsn;
            }
            SynchroniserOption::Password(password) => {
                if password.is_empty() {
                    return Err(Error::InvalidOption(
                        "password cannot be empty".to_string(),
                    ));
                }
                opts.password = Some(password);
            }
            SynchroniserOption::Db(db) => opts.db = db,
            SynchroniserOption::LockTimeout(secs) => opts.lock_timeout_secs = secs,
        }
        Ok(())
    }
}

// == Synchroniser Options ==
/// Resolved option set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchroniserOptions {
    pub dsn: String,
    pub password: Option<String>,
    pub db: i64,
    pub lock_timeout_secs: u64,
}

impl SynchroniserOptions {
    // == From Options ==
    /// Applies every option in order. A backend address is required.
    pub fn from_options<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = SynchroniserOption>,
    {
        let mut opts = Self::default();
        for option in options {
            option.apply(&mut opts)?;
        }
        if opts.dsn.is_empty() {
            return Err(Error::InvalidOption("dsn is required".to_string()));
        }
        Ok(opts)
    }

    // == Lock Timeout ==
    /// Lease TTL, falling back to [`DEFAULT_LOCK_TIMEOUT_SECS`] when unset.
    pub fn lock_timeout(&self) -> Duration {
        if self.lock_timeout_secs == 0 {
            Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.lock_timeout_secs)
        }
    }

    // == Connection Info ==
    /// Builds the client connection settings from the address, password and
    /// database. The password is passed through verbatim.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        let (host, port) = split_host_port(self.dsn.trim())?;
        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }
}

/// Splits `host:port`, `host` or `[v6]:port` into its parts.
fn split_host_port(dsn: &str) -> Result<(String, u16)> {
    let invalid = || Error::InvalidOption(format!("invalid dsn: {}", dsn));

    let (host, port) = match dsn.strip_prefix('[') {
        Some(rest) => {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            match tail {
                "" => (host, None),
                _ => (host, Some(tail.strip_prefix(':').ok_or_else(invalid)?)),
            }
        }
        None => match dsn.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (dsn, None),
        },
    };
    if host.is_empty() {
        return Err(invalid());
    }
    let port = match port {
        Some(port) => port.parse().map_err(|_| invalid())?,
        None => DEFAULT_REDIS_PORT,
    };
    Ok((host.to_string(), port))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_apply_in_order() {
        let opts = SynchroniserOptions::from_options([
            SynchroniserOption::Dsn("localhost:6379".to_string()),
            SynchroniserOption::Password("secret".to_string()),
            SynchroniserOption::Db(2),
            SynchroniserOption::LockTimeout(30),
        ])
        .unwrap();

        assert_eq!(opts.dsn, "localhost:6379");
        assert_eq!(opts.password.as_deref(), Some("secret"));
        assert_eq!(opts.db, 2);
        assert_eq!(opts.lock_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_dsn_rejected() {
        let result = SynchroniserOptions::from_options([SynchroniserOption::Dsn(String::new())]);
        assert!(matches!(result, Err(Error::InvalidOption(_))));
    }

    #[test]
    fn test_missing_dsn_rejected() {
        let result = SynchroniserOptions::from_options([SynchroniserOption::Db(1)]);
        assert!(matches!(result, Err(Error::InvalidOption(msg)) if msg == "dsn is required"));
    }

    #[test]
    fn test_empty_password_rejected() {
        let mut opts = SynchroniserOptions::default();
        let result = SynchroniserOption::Password(String::new()).apply(&mut opts);
        assert!(matches!(result, Err(Error::InvalidOption(_))));
        assert!(opts.password.is_none());
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let opts = SynchroniserOptions::from_options([
            SynchroniserOption::Dsn("localhost:6379".to_string()),
            SynchroniserOption::LockTimeout(0),
        ])
        .unwrap();

        assert_eq!(
            opts.lock_timeout(),
            Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS)
        );
    }

    fn info_for(dsn: &str) -> Result<ConnectionInfo> {
        SynchroniserOptions {
            dsn: dsn.to_string(),
            ..Default::default()
        }
        .connection_info()
    }

    #[test]
    fn test_connection_info() {
        let mut opts = SynchroniserOptions {
            dsn: "cache:6380".to_string(),
            ..Default::default()
        };
        let info = opts.connection_info().unwrap();
        assert_eq!(info.addr, ConnectionAddr::Tcp("cache".to_string(), 6380));
        assert_eq!(info.redis.db, 0);
        assert!(info.redis.password.is_none());

        opts.password = Some("pw".to_string());
        opts.db = 3;
        let info = opts.connection_info().unwrap();
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_password_with_reserved_characters_kept_verbatim() {
        for password in ["p@ss/word", "a#b?c", "100%41", "@/#%41"] {
            let opts = SynchroniserOptions::from_options([
                SynchroniserOption::Dsn("127.0.0.1:6379".to_string()),
                SynchroniserOption::Password(password.to_string()),
                SynchroniserOption::Db(2),
            ])
            .unwrap();

            let client = redis::Client::open(opts.connection_info().unwrap()).unwrap();
            let info = client.get_connection_info();
            assert_eq!(info.redis.password.as_deref(), Some(password));
            assert_eq!(info.redis.db, 2);
        }
    }

    #[test]
    fn test_dsn_forms() {
        assert_eq!(
            info_for("redis-host").unwrap().addr,
            ConnectionAddr::Tcp("redis-host".to_string(), 6379)
        );
        assert_eq!(
            info_for("[::1]:7000").unwrap().addr,
            ConnectionAddr::Tcp("::1".to_string(), 7000)
        );
        assert_eq!(
            info_for("[::1]").unwrap().addr,
            ConnectionAddr::Tcp("::1".to_string(), 6379)
        );
        assert!(matches!(info_for("host:notaport"), Err(Error::InvalidOption(_))));
        assert!(matches!(info_for(":6379"), Err(Error::InvalidOption(_))));
        assert!(matches!(info_for("[::1]x"), Err(Error::InvalidOption(_))));
    }
}

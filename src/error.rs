//! Error types for the synchronisers, cache and data stores
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Error Enum ==
/// Unified error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Lock identifier is empty, whitespace-only or too short
    #[error("invalid lock ID")]
    InvalidLockId,

    /// Another owner currently holds the lock
    #[error("lock is already held: {0}")]
    LockAlreadyHeld(String),

    /// The lock record is no longer in the registry
    #[error("lock is not held: {0}")]
    LockNotHeld(String),

    /// The registry holds a different record for this identifier
    #[error("lock does not match the held lock: {0}")]
    LockMismatch(String),

    /// Key not present in the cache
    #[error("not found")]
    NotFound,

    /// Cache constructed with a capacity below one
    #[error("cannot initialize cache with capacity {0}")]
    InvalidCapacity(usize),

    /// Rejected construction option
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// File identifier is empty or whitespace-only
    #[error("invalid file ID")]
    InvalidFileId,

    /// No record or data stored for this file identifier
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport or script failure reported by the lease backend
    #[error("backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Internal failure (closed handle, crashed task)
    #[error("internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::InvalidLockId.to_string(), "invalid lock ID");
        assert_eq!(
            Error::LockAlreadyHeld("abc".to_string()).to_string(),
            "lock is already held: abc"
        );
        assert_eq!(Error::NotFound.to_string(), "not found");
        assert_eq!(
            Error::InvalidCapacity(0).to_string(),
            "cannot initialize cache with capacity 0"
        );
    }
}

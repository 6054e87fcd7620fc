//! Error types for the cachekv library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (zero cache capacity, zero shard count, zero pool size). Fatal at startup.
//! - [`ConnectionError`]: Returned by a connection factory when a new
//!   backing-store handle cannot be opened.
//! - [`StoreError`]: Returned by a backing-store operation that failed.
//! - [`AcquireError`]: Returned by [`Pool::acquire_timeout`](crate::pool::Pool::acquire_timeout).
//! - [`ServiceError`]: Everything the request coordinator can fail with.
//!
//! `NotFound` is deliberately absent: a missing key is a normal outcome and is
//! reported as `Ok(None)` by [`KvService::read`](crate::service::KvService::read).
//!
//! ## Example Usage
//!
//! ```
//! use cachekv::error::ConfigError;
//! use cachekv::policy::sharded_lru::ShardedLruCache;
//!
//! let cache: Result<ShardedLruCache<i64, String>, ConfigError> = ShardedLruCache::new(100, 8);
//! assert!(cache.is_ok());
//!
//! let bad = ShardedLruCache::<i64, String>::new(0, 8);
//! assert!(bad.unwrap_err().to_string().contains("capacity"));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when construction parameters are invalid.
///
/// Produced by [`ShardedLruCache::new`](crate::policy::sharded_lru::ShardedLruCache::new),
/// [`Pool::new`](crate::pool::Pool::new), [`CacheBuilder::build`](crate::builder::CacheBuilder::build)
/// and [`KvConfig::validate`](crate::config::KvConfig::validate). Carries a
/// human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use cachekv::error::ConfigError;
/// use cachekv::pool::Pool;
///
/// let err = Pool::<u32>::new(0, || Ok(1)).unwrap_err();
/// assert!(err.to_string().contains("max size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// ConnectionError / StoreError
// ---------------------------------------------------------------------------

/// A connection factory could not produce a new backing-store handle.
#[derive(Debug, Error)]
#[error("failed to open store connection: {message}")]
pub struct ConnectionError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ConnectionError {
    /// Creates a connection error with a description only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A backing-store operation failed (connectivity or protocol fault).
#[derive(Debug, Error)]
#[error("store operation failed: {message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StoreError {
    /// Creates a store error with a description only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a store error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// AcquireError
// ---------------------------------------------------------------------------

/// Failure of a bounded pool acquisition.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// No connection became available before the deadline.
    #[error("timed out after {0:?} waiting for a pooled connection")]
    Timeout(Duration),

    /// The factory failed while opening a new connection for this caller.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors surfaced by [`KvService`](crate::service::KvService) operations.
///
/// Nothing is retried; the underlying cause is preserved for the caller to log.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The key could not be parsed as a signed integer. No store access happened.
    #[error("invalid key {0:?}: key must be an integer")]
    InvalidKey(String),

    /// The pool could not open a connection for this request.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The backing store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bounded acquisition expired.
    #[error("timed out after {0:?} waiting for a pooled connection")]
    Timeout(Duration),
}

impl ServiceError {
    /// Returns `true` for errors caused by the request itself rather than the
    /// store or pool.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidKey(_))
    }
}

impl From<AcquireError> for ServiceError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::Timeout(waited) => ServiceError::Timeout(waited),
            AcquireError::Connection(inner) => ServiceError::Connection(inner),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Cache-aside request coordinator.
//!
//! [`KvService`] ties one cache and one connection pool together and exposes
//! the three key/value operations, both as typed methods (`read`, `write`,
//! `delete`) and as string-keyed dispatch entry points (`handle_*`) that an
//! external listener maps onto its transport.
//!
//! ## Operation Flow
//!
//! ```text
//!   read(k)
//!     cache.get(k) ── hit ──────────────────────────────► Ok(Some(v))
//!         │ miss
//!         ▼
//!     pool.acquire() ─► conn.get(k) ─► Some(v) ─► cache.put(k, v) ─► Ok(Some(v))
//!                                  └─► None ─────────────────────► Ok(None)
//!
//!   write(k, v)
//!     pool.acquire() ─► conn.upsert(k, v) ─► cache.remove(k) ─► Ok(outcome)
//!
//!   delete(k)
//!     pool.acquire() ─► conn.delete(k) ─► cache.remove(k) ─► Ok(())
//! ```
//!
//! The store call always completes before the cache is touched, and absence
//! is never cached.
//!
//! ## Known Race
//!
//! A read that misses, queries the store, and then populates the cache can
//! interleave with a write to the same key:
//!
//! ```text
//!   reader:  cache miss ─► store get (old) ──────────────────► cache.put(old)
//!   writer:                      store upsert(new) ─► cache.remove
//! ```
//!
//! The stale value then stays cached until it is evicted, overwritten by a
//! later read after another invalidation, or invalidated again. Nothing here
//! guards against this.
//!
//! ## Status Mapping
//!
//! | Outcome                         | Status          | Body                                         |
//! |---------------------------------|-----------------|----------------------------------------------|
//! | read found                      | `Ok`            | the value                                    |
//! | read missing                    | `NotFound`      | `Key not found`                              |
//! | write, new key                  | `Created`       | `Created`                                    |
//! | write, existing key             | `Ok`            | `Updated`                                    |
//! | delete                          | `Ok`            | `Deleted`                                    |
//! | malformed key                   | `BadRequest`    | `Invalid key format. Key must be an integer.`|
//! | pool or store failure           | `InternalError` | `Internal server error: <cause>`             |

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, trace};

use crate::builder::{Cache, CacheBuilder};
use crate::config::KvConfig;
use crate::error::{ConfigError, ServiceError};
use crate::metrics::metrics_impl::ServiceCounters;
use crate::metrics::snapshot::ServiceMetricsSnapshot;
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::pool::{ConnectionFactory, Pool, PooledConnection};
use crate::store::traits::{KvStore, UpsertOutcome};
use crate::traits::ConcurrentCache;

const INVALID_KEY_BODY: &str = "Invalid key format. Key must be an integer.";

/// Outcome category of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Ok,
    Created,
    NotFound,
    BadRequest,
    InternalError,
}

impl Status {
    /// Conventional HTTP status code for listeners that speak HTTP.
    pub fn http_code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NotFound => 404,
            Status::BadRequest => 400,
            Status::InternalError => 500,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Created)
    }
}

/// Status plus body text returned by the `handle_*` entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: Status,
    pub body: String,
}

impl Response {
    fn new(status: Status, body: impl Into<String>) -> Self {
        Response {
            status,
            body: body.into(),
        }
    }

    fn from_error(err: &ServiceError) -> Self {
        if err.is_client_error() {
            Response::new(Status::BadRequest, INVALID_KEY_BODY)
        } else {
            Response::new(Status::InternalError, format!("Internal server error: {err}"))
        }
    }
}

/// Parses a request key. Accepts exactly what `i64::from_str` accepts.
pub fn parse_key(raw: &str) -> Result<i64, ServiceError> {
    raw.parse::<i64>().map_err(|_| ServiceError::InvalidKey(raw.to_owned()))
}

/// Cache-aside coordinator over a cache `C` and a pool of store connections
/// `S`.
pub struct KvService<S, C = Cache<i64, String>>
where
    C: ConcurrentCache<i64, String>,
{
    cache: C,
    pool: Pool<S>,
    acquire_timeout: Option<Duration>,
    counters: ServiceCounters,
}

impl<S> KvService<S>
where
    S: KvStore,
{
    /// Builds the cache and pool described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any parameter is invalid. No connection is
    /// opened here.
    pub fn from_config<F>(config: &KvConfig, factory: F) -> Result<Self, ConfigError>
    where
        F: ConnectionFactory<S> + 'static,
    {
        config.validate()?;
        let cache = CacheBuilder::new(config.cache_capacity)
            .policy(config.cache_policy())
            .build::<i64, String>()?;
        let pool = Pool::new(config.pool_max_size, factory)?;
        debug!(
            cache_capacity = config.cache_capacity,
            policy = ?cache.policy(),
            pool_max_size = config.pool_max_size,
            "kv service constructed"
        );

        let service = KvService::new(cache, pool);
        Ok(match config.acquire_timeout() {
            Some(timeout) => service.with_acquire_timeout(timeout),
            None => service,
        })
    }
}

impl<S, C> KvService<S, C>
where
    S: KvStore,
    C: ConcurrentCache<i64, String>,
{
    pub fn new(cache: C, pool: Pool<S>) -> Self {
        KvService {
            cache,
            pool,
            acquire_timeout: None,
            counters: ServiceCounters::default(),
        }
    }

    /// Bounds every connection wait to `timeout`. Without it, requests wait
    /// for a connection indefinitely.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn pool(&self) -> &Pool<S> {
        &self.pool
    }

    pub fn metrics(&self) -> ServiceMetricsSnapshot {
        self.counters.snapshot()
    }

    // -----------------------------------------------------------------------
    // Typed operations
    // -----------------------------------------------------------------------

    /// Returns the value for `key`, from the cache if present, otherwise from
    /// the store (populating the cache). `Ok(None)` when the store has no row.
    pub fn read(&self, key: i64) -> Result<Option<String>, ServiceError> {
        self.counters.inc_get();
        if let Some(value) = self.cache.get(&key) {
            self.counters.inc_cache_hit();
            trace!(key, "cache hit");
            return Ok(Some(value));
        }

        let fetched = self.with_connection(key, |conn| {
            self.counters.inc_store_read();
            Ok(conn.get(key)?)
        })?;
        if let Some(value) = &fetched {
            self.cache.put(key, value.clone());
        }
        Ok(fetched)
    }

    /// Upserts `value` into the store, then invalidates the cached copy.
    pub fn write(&self, key: i64, value: String) -> Result<UpsertOutcome, ServiceError> {
        let outcome = self.with_connection(key, |conn| Ok(conn.upsert(key, &value)?))?;
        self.cache.remove(&key);
        self.counters.inc_write();
        Ok(outcome)
    }

    /// Deletes `key` from the store, then invalidates the cached copy whether
    /// or not the row existed.
    pub fn delete(&self, key: i64) -> Result<(), ServiceError> {
        let existed = self.with_connection(key, |conn| Ok(conn.delete(key)?))?;
        self.cache.remove(&key);
        self.counters.inc_delete();
        trace!(key, existed, "deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dispatch entry points
    // -----------------------------------------------------------------------

    pub fn handle_get(&self, raw_key: &str) -> Response {
        let result = parse_key(raw_key).and_then(|key| self.read(key));
        match result {
            Ok(Some(value)) => Response::new(Status::Ok, value),
            Ok(None) => Response::new(Status::NotFound, "Key not found"),
            Err(err) => Response::from_error(&err),
        }
    }

    /// A missing body stores the empty string.
    pub fn handle_put(&self, raw_key: &str, body: Option<&str>) -> Response {
        let value = body.unwrap_or_default().to_owned();
        let result = parse_key(raw_key).and_then(|key| self.write(key, value));
        match result {
            Ok(UpsertOutcome::Inserted) => Response::new(Status::Created, "Created"),
            Ok(UpsertOutcome::Replaced) => Response::new(Status::Ok, "Updated"),
            Err(err) => Response::from_error(&err),
        }
    }

    pub fn handle_delete(&self, raw_key: &str) -> Response {
        let result = parse_key(raw_key).and_then(|key| self.delete(key));
        match result {
            Ok(()) => Response::new(Status::Ok, "Deleted"),
            Err(err) => Response::from_error(&err),
        }
    }

    /// Read counters in `name:value` lines.
    pub fn handle_stats(&self) -> Response {
        let snapshot = self.counters.snapshot();
        Response::new(
            Status::Ok,
            format!(
                "totalGets:{}\ncacheHits:{}\n",
                snapshot.total_gets, snapshot.cache_hits
            ),
        )
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn acquire(&self) -> Result<PooledConnection<'_, S>, ServiceError> {
        match self.acquire_timeout {
            Some(timeout) => Ok(self.pool.acquire_timeout(timeout)?),
            None => Ok(self.pool.acquire()?),
        }
    }

    /// Runs `op` on a pooled connection; the connection is back in the pool
    /// before this returns. Failures are counted and logged once here.
    fn with_connection<T, F>(&self, key: i64, op: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut S) -> Result<T, ServiceError>,
    {
        let result = self.acquire().and_then(|mut conn| op(&mut *conn));
        if let Err(err) = &result {
            self.counters.inc_error();
            error!(key, error = %err, "store request failed");
        }
        result
    }
}

impl<S, C> MetricsSnapshotProvider<ServiceMetricsSnapshot> for KvService<S, C>
where
    S: KvStore,
    C: ConcurrentCache<i64, String>,
{
    fn snapshot(&self) -> ServiceMetricsSnapshot {
        self.metrics()
    }
}

impl<S, C> fmt::Debug for KvService<S, C>
where
    C: ConcurrentCache<i64, String>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvService")
            .field("cache_len", &self.cache.len())
            .field("cache_capacity", &self.cache.capacity())
            .field("pool", &self.pool)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

//! In-memory backing store.
//!
//! ## Architecture
//! - One shared table (`RwLock<FxHashMap<i64, String>>`) per [`MemoryStore`].
//! - [`MemoryStore::connect`] hands out [`MemoryConnection`]s that all see the
//!   same table, the way connections to one database do.
//! - Metrics are tracked with atomics; any connection may update them.
//!
//! ## Fault Injection
//! - [`MemoryStore::set_refuse_connections`] makes `connect` fail.
//! - [`MemoryStore::set_fail_operations`] makes every operation on every
//!   connection fail with [`StoreError`].
//!
//! ## Example Usage
//! ```rust
//! use cachekv::store::memory::MemoryStore;
//! use cachekv::store::traits::{KvStore, UpsertOutcome};
//!
//! let store = MemoryStore::new();
//! let mut conn = store.connect().unwrap();
//! assert_eq!(conn.upsert(1, "a").unwrap(), UpsertOutcome::Inserted);
//! assert_eq!(conn.get(1).unwrap().as_deref(), Some("a"));
//! assert_eq!(store.connections_opened(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{ConnectionError, StoreError};
use crate::store::traits::{KvStore, StoreMetrics, UpsertOutcome};

#[derive(Debug, Default)]
struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    failures: AtomicU64,
}

impl StoreCounters {
    fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct Shared {
    table: RwLock<FxHashMap<i64, String>>,
    counters: StoreCounters,
    connections_opened: AtomicUsize,
    refuse_connections: AtomicBool,
    fail_operations: AtomicBool,
}

/// Shared in-memory table. Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `rows`.
    pub fn with_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let store = Self::new();
        store.shared.table.write().extend(rows);
        store
    }

    /// Opens a new connection to this store.
    pub fn connect(&self) -> Result<MemoryConnection, ConnectionError> {
        if self.shared.refuse_connections.load(Ordering::Acquire) {
            return Err(ConnectionError::new("memory store is refusing connections"));
        }
        let id = self.shared.connections_opened.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            id,
        })
    }

    /// A connection factory suitable for [`Pool::new`](crate::pool::Pool::new).
    pub fn factory(
        &self,
    ) -> impl Fn() -> Result<MemoryConnection, ConnectionError> + Send + Sync + 'static {
        let store = self.clone();
        move || store.connect()
    }

    pub fn connections_opened(&self) -> usize {
        self.shared.connections_opened.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.shared.counters.snapshot()
    }

    pub fn len(&self) -> usize {
        self.shared.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.table.read().is_empty()
    }

    /// Reads a row directly, bypassing connections and metrics.
    pub fn peek(&self, key: i64) -> Option<String> {
        self.shared.table.read().get(&key).cloned()
    }

    pub fn set_refuse_connections(&self, refuse: bool) {
        self.shared.refuse_connections.store(refuse, Ordering::Release);
    }

    pub fn set_fail_operations(&self, fail: bool) {
        self.shared.fail_operations.store(fail, Ordering::Release);
    }
}

/// One connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
    id: usize,
}

impl MemoryConnection {
    /// Sequence number of this connection (0 for the first one opened).
    pub fn id(&self) -> usize {
        self.id
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.shared.fail_operations.load(Ordering::Acquire) {
            StoreCounters::inc(&self.shared.counters.failures);
            return Err(StoreError::new(format!(
                "connection {} lost contact with memory store",
                self.id
            )));
        }
        Ok(())
    }
}

impl KvStore for MemoryConnection {
    fn get(&mut self, key: i64) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let value = self.shared.table.read().get(&key).cloned();
        let counters = &self.shared.counters;
        match value {
            Some(_) => StoreCounters::inc(&counters.hits),
            None => StoreCounters::inc(&counters.misses),
        }
        Ok(value)
    }

    fn upsert(&mut self, key: i64, value: &str) -> Result<UpsertOutcome, StoreError> {
        self.check_available()?;
        let previous = self.shared.table.write().insert(key, value.to_owned());
        let counters = &self.shared.counters;
        Ok(match previous {
            Some(_) => {
                StoreCounters::inc(&counters.updates);
                UpsertOutcome::Replaced
            },
            None => {
                StoreCounters::inc(&counters.inserts);
                UpsertOutcome::Inserted
            },
        })
    }

    fn delete(&mut self, key: i64) -> Result<bool, StoreError> {
        self.check_available()?;
        let existed = self.shared.table.write().remove(&key).is_some();
        StoreCounters::inc(&self.shared.counters.deletes);
        Ok(existed)
    }
}

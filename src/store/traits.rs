//! Backing-store interface.
//!
//! The store is the system of record; the cache only ever holds copies of
//! what the store returned. A store connection is owned exclusively by one
//! request at a time (through the pool), so operations take `&mut self`.

use crate::error::StoreError;

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub failures: u64,
}

/// Result of an upsert: whether the key was new or already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Operations the request coordinator needs from a backing-store connection.
pub trait KvStore {
    /// Fetch the value for `key`. `Ok(None)` when the row does not exist.
    fn get(&mut self, key: i64) -> Result<Option<String>, StoreError>;

    /// Insert `key`, or overwrite its value if it already exists.
    fn upsert(&mut self, key: i64, value: &str) -> Result<UpsertOutcome, StoreError>;

    /// Delete `key`. Returns whether a row existed; deleting a missing key is
    /// not an error.
    fn delete(&mut self, key: i64) -> Result<bool, StoreError>;
}

impl<S> KvStore for Box<S>
where
    S: KvStore + ?Sized,
{
    fn get(&mut self, key: i64) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn upsert(&mut self, key: i64, value: &str) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert(key, value)
    }

    fn delete(&mut self, key: i64) -> Result<bool, StoreError> {
        (**self).delete(key)
    }
}

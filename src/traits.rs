//! # Cache Capability Trait
//!
//! Every cache variant in this crate is used through one interface,
//! [`ConcurrentCache`]. The request coordinator only ever talks to that
//! trait, so the locking strategy (one global lock vs. N shard locks) is a
//! construction-time choice, not something callers branch on.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────────────────────────┐
//!                  │        ConcurrentCache<K, V>             │
//!                  │        (Send + Sync, all &self)          │
//!                  │                                          │
//!                  │  put(K, V)                               │
//!                  │  get(&K) → Option<V>      (promotes)     │
//!                  │  remove(&K) → bool                       │
//!                  │  clear()                                 │
//!                  │  len() → usize            (diagnostic)   │
//!                  │  capacity() → usize                      │
//!                  └───────────────────┬──────────────────────┘
//!                                      │
//!               ┌──────────────────────┼──────────────────────┐
//!               ▼                      ▼                      ▼
//!   ┌──────────────────────┐ ┌──────────────────────┐ ┌──────────────────────┐
//!   │   CoarseLruCache     │ │   ShardedLruCache    │ │   builder::Cache     │
//!   │ Mutex<LruShard>      │ │ Vec<Mutex<LruShard>> │ │ enum over the two    │
//!   └──────────────────────┘ └──────────────────────┘ └──────────────────────┘
//! ```
//!
//! ## Method Contracts
//!
//! | Method       | Contract                                                    |
//! |--------------|-------------------------------------------------------------|
//! | `put`        | Insert or replace; promote to MRU; evict LRU when full      |
//! | `get`        | On hit promote to MRU and return a clone; miss is side-free |
//! | `remove`     | Remove if present, report presence                          |
//! | `clear`      | Empty every shard                                           |
//! | `len`        | Sum of shard sizes; may be momentarily stale under writes   |
//! | `capacity`   | Configured total capacity                                   |
//!
//! None of these operations can fail: they are pure in-memory structure
//! manipulation. Values are returned by clone because the entry stays owned by
//! the shard that hosts it.
//!
//! ## Example Usage
//!
//! ```
//! use cachekv::policy::sharded_lru::ShardedLruCache;
//! use cachekv::traits::ConcurrentCache;
//!
//! fn warm<C: ConcurrentCache<i64, String>>(cache: &C, rows: &[(i64, &str)]) {
//!     for (key, value) in rows {
//!         cache.put(*key, value.to_string());
//!     }
//! }
//!
//! let cache = ShardedLruCache::new(64, 4).unwrap();
//! warm(&cache, &[(1, "a"), (2, "b")]);
//! assert_eq!(cache.get(&1), Some("a".to_string()));
//! assert_eq!(cache.len(), 2);
//! ```

/// Thread-safe key-value cache with LRU eviction.
///
/// All methods take `&self`; implementations synchronize internally.
pub trait ConcurrentCache<K, V>: Send + Sync {
    /// Inserts or updates `key`, making it the most recently used entry.
    ///
    /// When `key` is new and its partition is full, the least recently used
    /// entry of that partition is evicted first.
    fn put(&self, key: K, value: V);

    /// Returns a clone of the cached value and promotes `key` to MRU.
    fn get(&self, key: &K) -> Option<V>;

    /// Removes `key`; returns whether it was present.
    fn remove(&self, key: &K) -> bool;

    /// Removes every entry.
    fn clear(&self);

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Configured total capacity.
    fn capacity(&self) -> usize;

    /// Returns `true` when the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, C> ConcurrentCache<K, V> for std::sync::Arc<C>
where
    C: ConcurrentCache<K, V> + ?Sized,
{
    #[inline]
    fn put(&self, key: K, value: V) {
        (**self).put(key, value)
    }

    #[inline]
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    #[inline]
    fn remove(&self, key: &K) -> bool {
        (**self).remove(key)
    }

    #[inline]
    fn clear(&self) {
        (**self).clear()
    }

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

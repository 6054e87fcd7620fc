//! Unified cache builder for the two locking strategies.
//!
//! Callers pick a [`CachePolicy`] at construction; the returned [`Cache`]
//! implements [`ConcurrentCache`] the same way regardless of the variant.
//!
//! ## Example
//!
//! ```rust
//! use cachekv::builder::{CacheBuilder, CachePolicy};
//! use cachekv::traits::ConcurrentCache;
//!
//! let cache = CacheBuilder::new(100)
//!     .policy(CachePolicy::Sharded { shards: 8 })
//!     .build::<i64, String>()
//!     .unwrap();
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//! ```

use std::hash::Hash;

use crate::error::ConfigError;
use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::lru::CoarseLruCache;
use crate::policy::sharded_lru::{DEFAULT_SHARD_COUNT, ShardedLruCache};
use crate::traits::ConcurrentCache;

/// Available locking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// One global lock over a single LRU partition.
    Coarse,
    /// `shards` independently locked LRU partitions.
    Sharded { shards: usize },
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Sharded {
            shards: DEFAULT_SHARD_COUNT,
        }
    }
}

/// Cache wrapper that provides a consistent API regardless of policy.
pub struct Cache<K, V>
where
    K: Copy + Eq + Hash,
{
    inner: CacheInner<K, V>,
}

enum CacheInner<K, V>
where
    K: Copy + Eq + Hash,
{
    Coarse(CoarseLruCache<K, V>),
    Sharded(ShardedLruCache<K, V>),
}

impl<K, V> Cache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    pub fn policy(&self) -> CachePolicy {
        match &self.inner {
            CacheInner::Coarse(_) => CachePolicy::Coarse,
            CacheInner::Sharded(cache) => CachePolicy::Sharded {
                shards: cache.shard_count(),
            },
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.contains(key),
            CacheInner::Sharded(cache) => cache.contains(key),
        }
    }

    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.metrics_snapshot(),
            CacheInner::Sharded(cache) => cache.metrics_snapshot(),
        }
    }
}

impl<K, V> ConcurrentCache<K, V> for Cache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.put(key, value),
            CacheInner::Sharded(cache) => cache.put(key, value),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.get(key),
            CacheInner::Sharded(cache) => cache.get(key),
        }
    }

    fn remove(&self, key: &K) -> bool {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.remove(key),
            CacheInner::Sharded(cache) => cache.remove(key),
        }
    }

    fn clear(&self) {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.clear(),
            CacheInner::Sharded(cache) => cache.clear(),
        }
    }

    fn len(&self) -> usize {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.len(),
            CacheInner::Sharded(cache) => cache.len(),
        }
    }

    fn capacity(&self) -> usize {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.capacity(),
            CacheInner::Sharded(cache) => cache.capacity(),
        }
    }
}

impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for Cache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            CacheInner::Coarse(cache) => cache.fmt(f),
            CacheInner::Sharded(cache) => cache.fmt(f),
        }
    }
}

/// Builder for creating cache instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    capacity: usize,
    policy: CachePolicy,
}

impl CacheBuilder {
    /// Create a new cache builder with the specified capacity and the default
    /// sharded policy.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            policy: CachePolicy::default(),
        }
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build a cache with the configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the capacity or the shard count is 0.
    pub fn build<K, V>(self) -> Result<Cache<K, V>, ConfigError>
    where
        K: Copy + Eq + Hash + Send,
        V: Clone + Send,
    {
        let inner = match self.policy {
            CachePolicy::Coarse => CacheInner::Coarse(CoarseLruCache::new(self.capacity)?),
            CachePolicy::Sharded { shards } => {
                CacheInner::Sharded(ShardedLruCache::new(self.capacity, shards)?)
            },
        };

        Ok(Cache { inner })
    }
}

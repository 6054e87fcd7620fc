//! # Sharded LRU Cache
//!
//! Partitions the key space across independent [`LruShard`]s, each behind its
//! own `parking_lot::Mutex`, so operations on keys in different shards run in
//! parallel.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                     ShardedLruCache<K, V>                            │
//!   │                                                                      │
//!   │   key ──► ShardSelector::shard_for_key(key) ──► index                │
//!   │                                                                      │
//!   │   ┌──────────────┬──────────────┬──────────────┬──────────────┐      │
//!   │   │   shard 0    │   shard 1    │   shard 2    │   shard 3    │      │
//!   │   │ Mutex<Lru>   │ Mutex<Lru>   │ Mutex<Lru>   │ Mutex<Lru>   │      │
//!   │   │ capacity 3   │ capacity 3   │ capacity 2   │ capacity 2   │      │
//!   │   └──────────────┴──────────────┴──────────────┴──────────────┘      │
//!   │                    total capacity = 10, shards = 4                   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capacity Distribution
//!
//! | Total | Requested shards | Effective shards | Per-shard capacities |
//! |-------|------------------|------------------|----------------------|
//! | 10    | 4                | 4                | 3, 3, 2, 2           |
//! | 100   | 32               | 32               | 4 ×4, then 3 ×28     |
//! | 3     | 8                | 3                | 1, 1, 1              |
//!
//! The shard count is reduced when the capacity is smaller than the requested
//! count, so no shard ever has capacity 0 and the shard capacities always sum
//! to the total.
//!
//! ## Semantics
//!
//! - LRU order is per shard. A key may be evicted while a globally older key
//!   in another shard survives; only the shard-local order is exact.
//! - `len()` locks each shard in turn. Under concurrent writes the result is
//!   approximate but never exceeds `capacity()`.
//! - Every operation touches exactly one shard except `len`, `clear` and
//!   `metrics_snapshot`.

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::ds::ShardSelector;
use crate::error::ConfigError;
use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::lru::LruShard;
use crate::traits::ConcurrentCache;

/// Shard count used when none is configured.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Thread-safe LRU cache split into independently locked shards.
///
/// # Example
///
/// ```
/// use cachekv::policy::sharded_lru::ShardedLruCache;
/// use cachekv::traits::ConcurrentCache;
///
/// let cache: ShardedLruCache<i64, String> = ShardedLruCache::new(10, 4).unwrap();
/// assert_eq!(cache.shard_capacities(), vec![3, 3, 2, 2]);
///
/// cache.put(1, "one".to_string());
/// assert_eq!(cache.get(&1), Some("one".to_string()));
/// assert!(cache.remove(&1));
/// assert_eq!(cache.get(&1), None);
/// ```
pub struct ShardedLruCache<K, V>
where
    K: Copy + Eq + Hash,
{
    shards: Vec<Mutex<LruShard<K, V>>>,
    selector: ShardSelector,
    capacity: usize,
}

impl<K, V> ShardedLruCache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    /// Creates a cache with `capacity` entries spread over `shards` shards.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `capacity` or `shards` is 0.
    pub fn new(capacity: usize, shards: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("cache capacity must be greater than 0"));
        }
        if shards == 0 {
            return Err(ConfigError::new("shard count must be greater than 0"));
        }

        let shard_count = shards.min(capacity);
        let base = capacity / shard_count;
        let remainder = capacity % shard_count;
        let shards = (0..shard_count)
            .map(|i| {
                let shard_capacity = if i < remainder { base + 1 } else { base };
                Mutex::new(LruShard::new(shard_capacity))
            })
            .collect();

        Ok(ShardedLruCache {
            shards,
            selector: ShardSelector::new(shard_count, 0),
            capacity,
        })
    }

    /// Creates a cache with [`DEFAULT_SHARD_COUNT`] shards.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(capacity, DEFAULT_SHARD_COUNT)
    }

    /// Effective shard count (may be lower than requested).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_capacities(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.lock().capacity()).collect()
    }

    /// Index of the shard that owns `key`.
    pub fn shard_index(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    /// Returns a clone of the value without touching recency order.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.shard(key).lock().peek(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).lock().contains(key)
    }

    /// Sum of every shard's counters.
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.shards
            .iter()
            .map(|s| s.lock().metrics_snapshot())
            .fold(CacheMetricsSnapshot::default(), |acc, snap| acc + snap)
    }

    #[inline]
    fn shard(&self, key: &K) -> &Mutex<LruShard<K, V>> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let mut total = 0;
        for (index, shard) in self.shards.iter().enumerate() {
            let shard = shard.lock();
            shard.debug_validate_invariants();
            assert!(shard.capacity() > 0);
            for key in shard.keys_mru() {
                assert_eq!(self.selector.shard_for_key(key), index);
            }
            total += shard.capacity();
        }
        assert_eq!(total, self.capacity);
    }
}

impl<K, V> ConcurrentCache<K, V> for ShardedLruCache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        self.shard(&key).lock().insert(key, value);
    }

    fn get(&self, key: &K) -> Option<V> {
        self.shard(key).lock().get(key).cloned()
    }

    fn remove(&self, key: &K) -> bool {
        self.shard(key).lock().remove(key).is_some()
    }

    fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for ShardedLruCache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for ShardedLruCache<K, V>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruCache")
            .field("shards", &self.shards.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn rejects_zero_capacity_and_zero_shards() {
        assert!(ShardedLruCache::<i64, String>::new(0, 4).is_err());
        let err = ShardedLruCache::<i64, String>::new(10, 0).unwrap_err();
        assert!(err.message().contains("shard"));
    }

    #[test]
    fn remainder_goes_to_first_shards() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(10, 4).unwrap();
        assert_eq!(cache.shard_capacities(), vec![3, 3, 2, 2]);
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn even_split_has_equal_shards() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(64, 8).unwrap();
        assert!(cache.shard_capacities().iter().all(|&c| c == 8));
    }

    #[test]
    fn small_capacity_reduces_shard_count() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(3, 8).unwrap();
        assert_eq!(cache.shard_count(), 3);
        assert_eq!(cache.shard_capacities(), vec![1, 1, 1]);
        cache.debug_validate_invariants();
    }

    #[test]
    fn default_shard_count() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::with_capacity(1024).unwrap();
        assert_eq!(cache.shard_count(), DEFAULT_SHARD_COUNT);
        assert_eq!(cache.shard_capacities().iter().sum::<usize>(), 1024);
    }

    #[test]
    fn single_shard_behaves_as_plain_lru() {
        let cache: ShardedLruCache<i64, String> = ShardedLruCache::new(2, 1).unwrap();
        cache.put(1, "a".into());
        cache.put(2, "b".into());
        cache.get(&1);
        cache.put(3, "c".into());
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a".into()));
        assert_eq!(cache.get(&3), Some("c".into()));
    }

    #[test]
    fn key_routes_to_same_shard() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(100, 8).unwrap();
        for key in 0..50 {
            cache.put(key, key);
        }
        cache.debug_validate_invariants();
        for key in 0..50 {
            assert_eq!(cache.shard_index(&key), cache.shard_index(&key));
            assert_eq!(cache.peek(&key), Some(key));
        }
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(10, 4).unwrap();
        for key in 0..1_000 {
            cache.put(key, key);
            assert!(cache.len() <= 10);
        }
        cache.debug_validate_invariants();
    }

    #[test]
    fn clear_empties_every_shard() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(32, 4).unwrap();
        for key in 0..32 {
            cache.put(key, key);
        }
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn metrics_snapshot_sums_shards() {
        let cache: ShardedLruCache<i64, i64> = ShardedLruCache::new(16, 4).unwrap();
        for key in 0..8 {
            cache.put(key, key);
        }
        for key in 0..8 {
            cache.get(&key);
        }
        cache.get(&100);
        let snap = cache.metrics_snapshot();
        assert_eq!(snap.inserts, 8);
        assert_eq!(snap.get_hits, 8);
        assert_eq!(snap.get_misses, 1);
        assert_eq!(snap.capacity, 16);
        assert_eq!(snap.len, 8);
    }

    #[test]
    fn concurrent_mixed_operations_hold_invariants() {
        let cache = Arc::new(ShardedLruCache::<i64, i64>::new(64, 8).unwrap());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8_i64)
            .map(|t| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..1_000_i64 {
                        let key = (t * 31 + i) % 200;
                        match i % 3 {
                            0 => cache.put(key, key * 2),
                            1 => {
                                if let Some(v) = cache.get(&key) {
                                    assert_eq!(v, key * 2);
                                }
                            },
                            _ => {
                                cache.remove(&key);
                            },
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 64);
        cache.debug_validate_invariants();
    }
}

//! # Least Recently Used (LRU) Shard and Coarse-Lock Cache
//!
//! This module provides the single-threaded LRU partition used by every cache
//! variant in the crate, plus the simplest thread-safe wrapper around it: one
//! global lock over one partition.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                        CoarseLruCache<K, V>                              │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                    Mutex<LruShard<K, V>>                           │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │                                  │                                       │
//!   │                                  ▼                                       │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                         LruShard<K, V>                             │ │
//!   │   │                                                                    │ │
//!   │   │   ┌──────────────────────────────────────────────────────────────┐ │ │
//!   │   │   │  FxHashMap<K, Entry<V>>                                      │ │ │
//!   │   │   │                                                              │ │ │
//!   │   │   │  ┌─────────┬──────────────────────────────────────────┐      │ │ │
//!   │   │   │  │   Key   │  Entry { value, slot }                   │      │ │ │
//!   │   │   │  ├─────────┼──────────────────────────────────────────┤      │ │ │
//!   │   │   │  │   7     │  { "x", id_1 } ──────────────────────┐   │      │ │ │
//!   │   │   │  │   42    │  { "y", id_2 } ────────────────┐     │   │      │ │ │
//!   │   │   │  │   3     │  { "z", id_3 } ──────────┐     │     │   │      │ │ │
//!   │   │   │  └─────────┴──────────────────────────┼─────┼─────┼───┘      │ │ │
//!   │   │   └───────────────────────────────────────┼─────┼─────┼──────────┘ │ │
//!   │   │                                           │     │     │            │ │
//!   │   │   ┌───────────────────────────────────────┼─────┼─────┼──────────┐ │ │
//!   │   │   │  RecencyList<K>                       ▼     ▼     ▼          │ │ │
//!   │   │   │  head ──► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail            │ │ │
//!   │   │   │   (MRU)                                (LRU)                 │ │ │
//!   │   │   └──────────────────────────────────────────────────────────────┘ │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shard Invariants
//!
//! - The map's key set equals the set of keys in the recency list.
//! - `len() <= capacity()` after every completed operation.
//! - Each entry's `slot` is its own node in the recency list.
//!
//! ## LRU Operations Flow
//!
//! ```text
//!   INSERT new item (shard full, capacity = 3)
//!
//!     head ──► [A] ◄──► [B] ◄──► [C] ◄── tail
//!
//!   insert(D):
//!     1. Evict [C] from tail (list + map)
//!     2. Push [D] at head
//!
//!     head ──► [D] ◄──► [A] ◄──► [B] ◄── tail
//!
//!   ACCESS existing item
//!
//!   get(B):
//!     1. Find B's slot in the map: O(1)
//!     2. Splice the slot to head: O(1)
//!
//!     head ──► [B] ◄──► [D] ◄──► [A] ◄── tail
//! ```
//!
//! ## Thread Safety
//!
//! - `LruShard`: **NOT thread-safe**; callers hold a lock around it.
//! - `CoarseLruCache`: **Thread-safe** via one `parking_lot::Mutex`. `get`
//!   needs the exclusive lock too, because it reorders the recency list.
//!
//! For parallel throughput use
//! [`ShardedLruCache`](crate::policy::sharded_lru::ShardedLruCache), which
//! holds many `LruShard`s behind independent locks.

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::{RecencyList, SlotId};
use crate::error::ConfigError;
use crate::metrics::metrics_impl::LruMetrics;
use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::{CoreMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::ConcurrentCache;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    slot: SlotId,
}

/// Single-threaded LRU partition: key map plus recency sequence.
///
/// A capacity of 0 creates a shard that accepts no items; the cache types in
/// this crate never build one.
///
/// # Example
///
/// ```
/// use cachekv::policy::lru::LruShard;
///
/// let mut shard: LruShard<i64, String> = LruShard::new(2);
/// shard.insert(1, "a".to_string());
/// shard.insert(2, "b".to_string());
/// shard.get(&1); // 1 is now MRU
/// shard.insert(3, "c".to_string()); // evicts 2
///
/// assert!(shard.contains(&1));
/// assert!(!shard.contains(&2));
/// ```
pub struct LruShard<K, V>
where
    K: Copy + Eq + Hash,
{
    map: FxHashMap<K, Entry<V>>,
    order: RecencyList<K>,
    capacity: usize,
    metrics: LruMetrics,
}

impl<K, V> LruShard<K, V>
where
    K: Copy + Eq + Hash,
{
    #[inline]
    pub fn new(capacity: usize) -> Self {
        LruShard {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            order: RecencyList::with_capacity(capacity),
            capacity,
            metrics: LruMetrics::default(),
        }
    }

    /// Inserts or replaces `key` at the MRU position.
    ///
    /// Returns the previous value when `key` was already present. When the key
    /// is new and the shard is full, the LRU entry is evicted first.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(entry) = self.map.get_mut(&key) {
            self.metrics.record_insert_update();
            let previous = std::mem::replace(&mut entry.value, value);
            let slot = entry.slot;
            self.order.move_to_front(slot);

            #[cfg(debug_assertions)]
            self.debug_validate_invariants();

            return Some(previous);
        }

        if self.capacity == 0 {
            return None;
        }

        if self.map.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_back() {
                self.map.remove(&evicted);
                self.metrics.record_evicted_entry();
            }
        }

        self.metrics.record_insert_new();
        let slot = self.order.push_front(key);
        self.map.insert(key, Entry { value, slot });

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        None
    }

    /// Returns the value and promotes `key` to MRU. A miss has no side effect
    /// beyond the miss counter.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let Some(entry) = self.map.get(key) else {
            self.metrics.record_get_miss();
            return None;
        };
        self.metrics.record_get_hit();
        self.order.move_to_front(entry.slot);
        Some(&entry.value)
    }

    /// Returns the value without touching recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|entry| &entry.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.map.remove(key)?;
        self.order.remove(entry.slot);
        self.metrics.record_remove();

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        Some(entry.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let key = self.order.pop_back()?;
        let entry = self.map.remove(&key)?;
        Some((key, entry.value))
    }

    /// Returns the least recently used entry without removing it.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let key = self.order.back()?;
        self.map.get(key).map(|entry| (key, &entry.value))
    }

    /// Position of `key` in recency order (0 = MRU). O(n).
    pub fn recency_rank(&self, key: &K) -> Option<usize> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.order.iter().position(|k| k == key)
    }

    /// Keys from MRU to LRU.
    pub fn keys_mru(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.metrics.record_clear();
        self.map.clear();
        self.order.clear();
    }

    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot(self.map.len(), self.capacity)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.order.debug_validate_invariants();
        assert_eq!(self.map.len(), self.order.len());
        assert!(self.map.len() <= self.capacity);
        for (key, entry) in &self.map {
            assert!(self.order.key(entry.slot) == Some(key));
        }
    }
}

impl<K, V> fmt::Debug for LruShard<K, V>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruShard")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for LruShard<K, V>
where
    K: Copy + Eq + Hash,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

/// Thread-safe LRU cache guarded by a single global lock.
///
/// Every operation, including `get`, serializes on one mutex. Useful as a
/// baseline and for small caches where contention does not matter.
///
/// # Example
///
/// ```
/// use cachekv::policy::lru::CoarseLruCache;
/// use cachekv::traits::ConcurrentCache;
///
/// let cache: CoarseLruCache<i64, String> = CoarseLruCache::new(2).unwrap();
/// cache.put(1, "a".to_string());
/// cache.put(2, "b".to_string());
/// cache.put(3, "c".to_string());
///
/// assert_eq!(cache.get(&1), None);
/// assert_eq!(cache.get(&3), Some("c".to_string()));
/// ```
pub struct CoarseLruCache<K, V>
where
    K: Copy + Eq + Hash,
{
    inner: Mutex<LruShard<K, V>>,
}

impl<K, V> CoarseLruCache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("cache capacity must be greater than 0"));
        }
        Ok(CoarseLruCache {
            inner: Mutex::new(LruShard::new(capacity)),
        })
    }

    /// Returns a clone of the value without touching recency order.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> ConcurrentCache<K, V> for CoarseLruCache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    fn remove(&self, key: &K) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for CoarseLruCache<K, V>
where
    K: Copy + Eq + Hash + Send,
    V: Clone + Send,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for CoarseLruCache<K, V>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shard = self.inner.lock();
        f.debug_struct("CoarseLruCache")
            .field("len", &shard.len())
            .field("capacity", &shard.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_with(capacity: usize, keys: &[i64]) -> LruShard<i64, String> {
        let mut shard = LruShard::new(capacity);
        for &k in keys {
            shard.insert(k, format!("v{k}"));
        }
        shard
    }

    // ==============================================
    // LruShard: basic behavior
    // ==============================================

    mod shard_basics {
        use super::*;

        #[test]
        fn insert_then_get_returns_value() {
            let mut shard = shard_with(4, &[1]);
            assert_eq!(shard.get(&1).map(String::as_str), Some("v1"));
        }

        #[test]
        fn update_replaces_value_and_returns_previous() {
            let mut shard = shard_with(4, &[1]);
            let prev = shard.insert(1, "new".to_string());
            assert_eq!(prev.as_deref(), Some("v1"));
            assert_eq!(shard.peek(&1).map(String::as_str), Some("new"));
            assert_eq!(shard.len(), 1);
        }

        #[test]
        fn miss_has_no_side_effect() {
            let mut shard = shard_with(2, &[1, 2]);
            assert!(shard.get(&99).is_none());
            assert_eq!(shard.keys_mru().copied().collect::<Vec<_>>(), vec![2, 1]);
        }

        #[test]
        fn zero_capacity_rejects_inserts() {
            let mut shard: LruShard<i64, String> = LruShard::new(0);
            shard.insert(1, "a".into());
            assert!(shard.is_empty());
        }

        #[test]
        fn remove_reports_presence() {
            let mut shard = shard_with(3, &[1, 2]);
            assert_eq!(shard.remove(&1).as_deref(), Some("v1"));
            assert!(shard.remove(&1).is_none());
            assert_eq!(shard.len(), 1);
            shard.debug_validate_invariants();
        }

        #[test]
        fn clear_empties_shard() {
            let mut shard = shard_with(3, &[1, 2, 3]);
            shard.clear();
            assert!(shard.is_empty());
            assert!(shard.peek_lru().is_none());
            shard.insert(4, "v4".into());
            assert_eq!(shard.len(), 1);
        }
    }

    // ==============================================
    // LruShard: eviction order
    // ==============================================

    mod eviction {
        use super::*;

        #[test]
        fn evicts_oldest_insert() {
            let mut shard = shard_with(2, &[1, 2, 3]);
            assert!(!shard.contains(&1));
            assert!(shard.contains(&2));
            assert!(shard.contains(&3));
        }

        #[test]
        fn get_protects_from_eviction() {
            let mut shard = shard_with(2, &[1, 2]);
            shard.get(&1);
            shard.insert(3, "v3".into());
            assert!(shard.contains(&1));
            assert!(!shard.contains(&2));
        }

        #[test]
        fn update_protects_from_eviction() {
            let mut shard = shard_with(2, &[1, 2]);
            shard.insert(1, "again".into());
            shard.insert(3, "v3".into());
            assert!(shard.contains(&1));
            assert!(!shard.contains(&2));
        }

        #[test]
        fn peek_does_not_promote() {
            let mut shard = shard_with(2, &[1, 2]);
            shard.peek(&1);
            shard.insert(3, "v3".into());
            assert!(!shard.contains(&1));
        }

        #[test]
        fn pop_and_peek_lru() {
            let mut shard = shard_with(3, &[1, 2, 3]);
            assert_eq!(shard.peek_lru().map(|(k, _)| *k), Some(1));
            assert_eq!(shard.pop_lru().map(|(k, _)| k), Some(1));
            assert_eq!(shard.len(), 2);
            shard.debug_validate_invariants();
        }

        #[test]
        fn recency_rank_tracks_access() {
            let mut shard = shard_with(3, &[1, 2, 3]);
            assert_eq!(shard.recency_rank(&3), Some(0));
            assert_eq!(shard.recency_rank(&1), Some(2));
            shard.get(&1);
            assert_eq!(shard.recency_rank(&1), Some(0));
            assert_eq!(shard.recency_rank(&42), None);
        }

        #[test]
        fn eviction_counts_in_metrics() {
            let mut shard = shard_with(2, &[1, 2, 3, 4]);
            shard.get(&4);
            shard.get(&1);
            let snap = shard.metrics_snapshot();
            assert_eq!(snap.evictions, 2);
            assert_eq!(snap.inserts, 4);
            assert_eq!(snap.get_hits, 1);
            assert_eq!(snap.get_misses, 1);
            assert_eq!(snap.len, 2);
        }
    }

    // ==============================================
    // CoarseLruCache
    // ==============================================

    mod coarse {
        use std::sync::Arc;
        use std::thread;

        use super::*;

        #[test]
        fn rejects_zero_capacity() {
            let err = CoarseLruCache::<i64, String>::new(0).unwrap_err();
            assert!(err.message().contains("capacity"));
        }

        #[test]
        fn trait_operations() {
            let cache = CoarseLruCache::new(2).unwrap();
            cache.put(1, "a".to_string());
            cache.put(2, "b".to_string());
            assert!(cache.remove(&1));
            assert!(!cache.remove(&1));
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.capacity(), 2);
            cache.clear();
            assert!(cache.is_empty());
        }

        #[test]
        fn concurrent_puts_stay_within_capacity() {
            let cache = Arc::new(CoarseLruCache::new(16).unwrap());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let cache = cache.clone();
                    thread::spawn(move || {
                        for i in 0..500_i64 {
                            cache.put(t * 1000 + i, i.to_string());
                            cache.get(&(t * 1000 + i / 2));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert!(cache.len() <= 16);
            cache.inner.lock().debug_validate_invariants();
        }
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Put(i64),
        Get(i64),
        Remove(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0_i64..16).prop_map(Op::Put),
            (0_i64..16).prop_map(Op::Get),
            (0_i64..16).prop_map(Op::Remove),
        ]
    }

    proptest! {
        /// Property: the shard matches a reference model where the front of a
        /// deque is MRU and eviction pops the back.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_matches_reference_model(
            capacity in 1usize..6,
            ops in prop::collection::vec(op_strategy(), 0..200)
        ) {
            let mut shard: LruShard<i64, i64> = LruShard::new(capacity);
            let mut model: VecDeque<i64> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Put(k) => {
                        if let Some(pos) = model.iter().position(|&m| m == k) {
                            model.remove(pos);
                        } else if model.len() == capacity {
                            let evicted = model.pop_back().unwrap();
                            prop_assert_eq!(shard.peek_lru().map(|(k, _)| *k), Some(evicted));
                        }
                        model.push_front(k);
                        shard.insert(k, k * 10);
                    },
                    Op::Get(k) => {
                        let hit = shard.get(&k).copied();
                        if let Some(pos) = model.iter().position(|&m| m == k) {
                            model.remove(pos);
                            model.push_front(k);
                            prop_assert_eq!(hit, Some(k * 10));
                        } else {
                            prop_assert_eq!(hit, None);
                        }
                    },
                    Op::Remove(k) => {
                        let present = model.iter().position(|&m| m == k);
                        if let Some(pos) = present {
                            model.remove(pos);
                        }
                        prop_assert_eq!(shard.remove(&k).is_some(), present.is_some());
                    },
                }

                prop_assert!(shard.len() <= capacity);
                let order: Vec<i64> = shard.keys_mru().copied().collect();
                prop_assert_eq!(order, model.iter().copied().collect::<Vec<_>>());
            }
            shard.debug_validate_invariants();
        }
    }
}

//! Deterministic key-to-shard routing.
//!
//! Used by [`ShardedLruCache`](crate::policy::sharded_lru::ShardedLruCache) to
//! pick the shard (and therefore the lock) that owns a key.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                            │
//! │                                                                         │
//! │   Input Key (i64)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐     │
//! │   │  ShardSelector { shards: 4, seed: 0 }                         │     │
//! │   │                                                               │     │
//! │   │  1. Create DefaultHasher (fixed SipHash keys)                 │     │
//! │   │  2. Hash seed: 0.hash(&mut hasher)                            │     │
//! │   │  3. Hash key:  key.hash(&mut hasher)                          │     │
//! │   │  4. Compute:   hasher.finish() % 4                            │     │
//! │   └───────────────────────────────────────────────────────────────┘     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                             │
//! │   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │                             │
//! │   │ Mutex   │ Mutex   │ Mutex   │ Mutex   │                             │
//! │   └─────────┴─────────┴─────────┴─────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Properties:
//! - Deterministic: the same `(key, seed, shards)` always yields the same
//!   shard, across runs and processes.
//! - Uniform: sequential integer keys spread evenly because they are hashed,
//!   not taken modulo directly.
//!
//! ## Example Usage
//!
//! ```
//! use cachekv::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4, 0);
//! let shard = selector.shard_for_key(&42_i64);
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key(&42_i64), shard);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic shard selector using a seeded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with the given `seed`.
    ///
    /// The shard count is clamped to at least 1.
    ///
    /// ```
    /// use cachekv::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(16, 0).shard_count(), 16);
    /// assert_eq!(ShardSelector::new(0, 0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() % self.shards as u64) as usize
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector with seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_selector_is_deterministic() {
        let selector = ShardSelector::new(8, 123);

        let a = selector.shard_for_key(&99_i64);
        let b = selector.shard_for_key(&99_i64);
        assert_eq!(a, b);
        assert!(a < selector.shard_count());
    }

    #[test]
    fn identical_selectors_agree() {
        let left = ShardSelector::new(32, 0);
        let right = ShardSelector::new(32, 0);
        for key in -500_i64..500 {
            assert_eq!(left.shard_for_key(&key), right.shard_for_key(&key));
        }
    }

    #[test]
    fn sequential_keys_cover_every_shard() {
        let selector = ShardSelector::new(8, 0);
        let mut counts = [0usize; 8];
        for key in 0_i64..8_000 {
            counts[selector.shard_for_key(&key)] += 1;
        }
        // 1000 expected per shard; allow generous skew.
        for count in counts {
            assert!(count > 500, "shard underfilled: {counts:?}");
        }
    }

    #[test]
    fn single_shard_always_zero() {
        let selector = ShardSelector::default();
        for key in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(selector.shard_for_key(&key), 0);
        }
    }
}

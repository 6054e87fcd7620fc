//! # Metrics Traits
//!
//! Recording and snapshotting are split into two small traits so the cache
//! and coordinator code only ever writes counters, while an external metrics
//! collaborator only ever reads snapshots.
//!
//! ```text
//!   ┌──────────────────────────────┐        ┌──────────────────────────────┐
//!   │     CoreMetricsRecorder      │        │  MetricsSnapshotProvider<S>  │
//!   │  get_hit / get_miss          │        │  snapshot() → S              │
//!   │  insert_new / insert_update  │        │                              │
//!   │  evicted_entry / remove      │        │  LruShard, ShardedLruCache,  │
//!   │  clear                       │        │  CoarseLruCache, KvService   │
//!   └──────────────────────────────┘        └──────────────────────────────┘
//! ```

/// Counters every LRU partition records while its lock is held.
pub trait CoreMetricsRecorder {
    fn record_get_hit(&mut self);
    fn record_get_miss(&mut self);
    fn record_insert_new(&mut self);
    fn record_insert_update(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_remove(&mut self);
    fn record_clear(&mut self);
}

/// Produces a point-in-time copy of an instance's counters.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

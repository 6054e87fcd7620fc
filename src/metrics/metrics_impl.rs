use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::{CacheMetricsSnapshot, ServiceMetricsSnapshot};
use crate::metrics::traits::CoreMetricsRecorder;

/// Per-shard counters. Plain integers: every write happens under the shard lock.
#[derive(Debug, Default, Clone)]
pub struct LruMetrics {
    pub get_hits: u64,
    pub get_misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub evictions: u64,
    pub removes: u64,
    pub clears: u64,
}

impl LruMetrics {
    pub fn snapshot(&self, len: usize, capacity: usize) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            get_hits: self.get_hits,
            get_misses: self.get_misses,
            inserts: self.inserts,
            updates: self.updates,
            evictions: self.evictions,
            removes: self.removes,
            clears: self.clears,
            len,
            capacity,
        }
    }
}

impl CoreMetricsRecorder for LruMetrics {
    fn record_get_hit(&mut self) {
        self.get_hits += 1;
    }

    fn record_get_miss(&mut self) {
        self.get_misses += 1;
    }

    fn record_insert_new(&mut self) {
        self.inserts += 1;
    }

    fn record_insert_update(&mut self) {
        self.updates += 1;
    }

    fn record_evicted_entry(&mut self) {
        self.evictions += 1;
    }

    fn record_remove(&mut self) {
        self.removes += 1;
    }

    fn record_clear(&mut self) {
        self.clears += 1;
    }
}

/// Request counters owned by one [`KvService`](crate::service::KvService).
///
/// Atomics because handlers run on many worker threads with no shared lock.
#[derive(Debug, Default)]
pub struct ServiceCounters {
    total_gets: AtomicU64,
    cache_hits: AtomicU64,
    store_reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl ServiceCounters {
    pub fn inc_get(&self) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_read(&self) {
        self.store_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServiceMetricsSnapshot {
        ServiceMetricsSnapshot {
            total_gets: self.total_gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            store_reads: self.store_reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_metrics_snapshot_copies_counters() {
        let mut metrics = LruMetrics::default();
        metrics.record_get_hit();
        metrics.record_get_miss();
        metrics.record_get_miss();
        metrics.record_insert_new();
        metrics.record_evicted_entry();

        let snap = metrics.snapshot(3, 10);
        assert_eq!(snap.get_hits, 1);
        assert_eq!(snap.get_misses, 2);
        assert_eq!(snap.inserts, 1);
        assert_eq!(snap.evictions, 1);
        assert_eq!(snap.len, 3);
        assert_eq!(snap.capacity, 10);
    }

    #[test]
    fn service_counters_are_shared_across_threads() {
        let counters = std::sync::Arc::new(ServiceCounters::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counters.inc_get();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.snapshot().total_gets, 1000);
    }
}

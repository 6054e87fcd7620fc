use std::ops::Add;

/// Cache counters plus gauges captured at snapshot time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub evictions: u64,
    pub removes: u64,
    pub clears: u64,

    // gauges
    pub len: usize,
    pub capacity: usize,
}

impl CacheMetricsSnapshot {
    /// Fraction of `get` calls that hit, or 0.0 before any lookups.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.get_hits + self.get_misses;
        if lookups == 0 {
            0.0
        } else {
            self.get_hits as f64 / lookups as f64
        }
    }
}

impl Add for CacheMetricsSnapshot {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            get_hits: self.get_hits + rhs.get_hits,
            get_misses: self.get_misses + rhs.get_misses,
            inserts: self.inserts + rhs.inserts,
            updates: self.updates + rhs.updates,
            evictions: self.evictions + rhs.evictions,
            removes: self.removes + rhs.removes,
            clears: self.clears + rhs.clears,
            len: self.len + rhs.len,
            capacity: self.capacity + rhs.capacity,
        }
    }
}

/// Request-level counters of a [`KvService`](crate::service::KvService).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceMetricsSnapshot {
    pub total_gets: u64,
    pub cache_hits: u64,
    pub store_reads: u64,
    pub writes: u64,
    pub deletes: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_handles_zero_lookups() {
        assert_eq!(CacheMetricsSnapshot::default().hit_ratio(), 0.0);
    }

    #[test]
    fn add_sums_every_field() {
        let a = CacheMetricsSnapshot {
            get_hits: 3,
            get_misses: 1,
            len: 2,
            capacity: 5,
            ..Default::default()
        };
        let b = CacheMetricsSnapshot {
            get_hits: 1,
            evictions: 4,
            len: 1,
            capacity: 5,
            ..Default::default()
        };
        let sum = a + b;
        assert_eq!(sum.get_hits, 4);
        assert_eq!(sum.evictions, 4);
        assert_eq!(sum.len, 3);
        assert_eq!(sum.capacity, 10);
        assert!((sum.hit_ratio() - 0.8).abs() < f64::EPSILON);
    }
}

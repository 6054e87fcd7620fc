pub use crate::builder::{Cache, CacheBuilder, CachePolicy};
pub use crate::config::{KvConfig, LockStrategy};
pub use crate::ds::ShardSelector;
pub use crate::error::{AcquireError, ConfigError, ConnectionError, ServiceError, StoreError};
pub use crate::metrics::snapshot::{CacheMetricsSnapshot, ServiceMetricsSnapshot};
pub use crate::metrics::traits::MetricsSnapshotProvider;
pub use crate::policy::lru::{CoarseLruCache, LruShard};
pub use crate::policy::sharded_lru::ShardedLruCache;
pub use crate::pool::{ConnectionFactory, Pool, PoolStats, PooledConnection};
pub use crate::service::{KvService, Response, Status};
pub use crate::store::memory::{MemoryConnection, MemoryStore};
pub use crate::store::traits::{KvStore, StoreMetrics, UpsertOutcome};
pub use crate::traits::ConcurrentCache;

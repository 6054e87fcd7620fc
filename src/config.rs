//! Construction parameters for a [`KvService`](crate::service::KvService).
//!
//! The core reads no files. An outer layer deserializes [`KvConfig`] from
//! whatever format it owns (every field has a default) and hands it to
//! [`KvService::from_config`](crate::service::KvService::from_config) along
//! with a connection factory.
//!
//! ```
//! use cachekv::config::{KvConfig, LockStrategy};
//!
//! let config = KvConfig {
//!     cache_capacity: 4096,
//!     lock_strategy: LockStrategy::Coarse,
//!     ..KvConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::builder::CachePolicy;
use crate::error::ConfigError;
use crate::policy::sharded_lru::DEFAULT_SHARD_COUNT;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_POOL_MAX_SIZE: usize = 8;

/// Which cache variant to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    /// A single lock over the whole cache.
    Coarse,
    /// `shard_count` independently locked shards.
    #[default]
    Sharded,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KvConfig {
    /// Total cache entries across all shards.
    pub cache_capacity: usize,
    /// Requested shard count; ignored by the coarse strategy.
    pub shard_count: usize,
    pub lock_strategy: LockStrategy,
    /// Upper bound on open store connections (and so on concurrent store
    /// operations).
    pub pool_max_size: usize,
    /// Bounded wait for a pooled connection. `None` waits forever.
    pub acquire_timeout_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            shard_count: DEFAULT_SHARD_COUNT,
            lock_strategy: LockStrategy::default(),
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            acquire_timeout_ms: None,
        }
    }
}

impl KvConfig {
    /// Checks every parameter that would otherwise fail at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::new("cache capacity must be greater than 0"));
        }
        if self.lock_strategy == LockStrategy::Sharded && self.shard_count == 0 {
            return Err(ConfigError::new("shard count must be greater than 0"));
        }
        if self.pool_max_size == 0 {
            return Err(ConfigError::new("pool max size must be greater than 0"));
        }
        if self.acquire_timeout_ms == Some(0) {
            return Err(ConfigError::new("acquire timeout must be greater than 0 ms"));
        }
        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        match self.lock_strategy {
            LockStrategy::Coarse => CachePolicy::Coarse,
            LockStrategy::Sharded => CachePolicy::Sharded {
                shards: self.shard_count,
            },
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

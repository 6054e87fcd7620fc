pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use snapshot::{CacheMetricsSnapshot, ServiceMetricsSnapshot};
pub use traits::MetricsSnapshotProvider;

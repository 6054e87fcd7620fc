//! cachekv: a cache-aside key/value core.
//!
//! A sharded, thread-safe LRU cache sits in front of a backing store reached
//! through a bounded, blocking connection pool. [`service::KvService`]
//! coordinates the two: reads try the cache first and fill it from the store
//! on a miss; writes and deletes go to the store first and then invalidate the
//! cached copy.
//!
//! ```text
//!   listener ──► KvService::handle_{get,put,delete}
//!                   │
//!                   ├──► ConcurrentCache (ShardedLruCache | CoarseLruCache)
//!                   │
//!                   └──► Pool<S> ──► S: KvStore (one connection per request)
//! ```
//!
//! The crate owns no listener, no wire format and no concrete database; an
//! outer layer supplies the transport, a [`config::KvConfig`] and a connection
//! factory. [`store::memory::MemoryStore`] is an in-memory backend for tests.

pub mod builder;
pub mod config;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod prelude;
pub mod service;
pub mod store;
pub mod traits;

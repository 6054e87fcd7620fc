pub mod memory;
pub mod traits;

pub use memory::{MemoryConnection, MemoryStore};
pub use traits::{KvStore, StoreMetrics, UpsertOutcome};

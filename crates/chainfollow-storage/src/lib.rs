//! chainfollow-storage: projection store and job queue backends for ChainFollow.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing/replay, no persistence)
//! - `postgres`: PostgreSQL via `sqlx` (feature: `postgres`)

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{InMemoryAssetStore, MemoryJobQueue, QueuedJob};

//! Key cache: snapshots, backing stores, in-flight coalescing and the lookup coordinator.

pub mod coordinator;
pub mod entry;
pub mod store;

mod inflight;

#[cfg(feature = "redis")] pub use store::RedisKeyStore;

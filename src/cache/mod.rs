//! Cache Module
//!
//! Provides in-memory caching with an absolute TTL and LRU eviction.

mod entry;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::{LruList, NodeId};
pub use shared::Cache;
pub use stats::{CacheStats, ResponseTimes, MAX_RESPONSE_SAMPLES};
pub use store::LruCache;

//! Queue Module
//!
//! In-flight deduplication and a concurrency-capped task runner.

mod dedup;

use serde::Serialize;

pub use dedup::DedupQueue;

// == Queue Status ==
/// Live view of the queue, safe to poll at any rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Tasks waiting for a concurrency slot
    pub queue_length: usize,
    /// Tasks currently fetching
    pub active_count: usize,
    /// Keys with a queued or running fetch, sorted
    pub in_flight_keys: Vec<String>,
}

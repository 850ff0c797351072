//! Request Shield - an in-process admission and caching layer
//!
//! Protects a slow backing store with per-caller rate limiting, an LRU cache
//! with absolute TTL, and a queue that coalesces concurrent fetches of the
//! same key under a global concurrency cap.

pub mod admission;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod rate_limit;
pub mod store;
pub mod tasks;

pub use admission::{Admission, Admitted, Lookup};
pub use api::AppState;
pub use config::Config;
pub use error::{FetchError, ShieldError};

//! Background Tasks Module
//!
//! Contains the periodic task primitive that drives background sweeps.
//!
//! # Tasks
//! - Cache sweep: removes expired cache entries (see [`crate::cache::Cache`])
//! - Bucket sweep: drops idle rate-limit buckets (see [`crate::rate_limit::RateLimiter`])

mod periodic;

pub use periodic::PeriodicTask;

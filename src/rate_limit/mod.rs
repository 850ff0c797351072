//! Rate Limit Module
//!
//! Dual token bucket admission control: a sustained bucket bounds the
//! long-run request rate, a burst bucket tolerates short spikes.

mod bucket;
mod limiter;

pub use bucket::{RateLimitBucket, RateLimitDecision};
pub use limiter::RateLimiter;

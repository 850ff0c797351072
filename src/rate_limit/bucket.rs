//! Dual Token Bucket
//!
//! One caller's sustained and burst allowances.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

// == Decision ==
/// Outcome of a single `consume` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Sustained capacity, for `X-RateLimit-Limit`
    pub limit: u32,
    /// Sustained tokens left after this call
    pub remaining: u32,
    /// Burst tokens left after this call
    pub burst_remaining: u32,
    /// Retry or refill guidance in whole seconds
    pub reset_in_seconds: u64,
}

// == Bucket ==
#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    pub sustained_tokens: u32,
    pub burst_tokens: u32,
    pub last_sustained_refill: Instant,
    pub last_burst_refill: Instant,
}

impl RateLimitBucket {
    /// A fully provisioned bucket.
    pub fn full(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            sustained_tokens: config.sustained_capacity,
            burst_tokens: config.burst_capacity,
            last_sustained_refill: now,
            last_burst_refill: now,
        }
    }

    /// Adds whole sustained tokens earned since the last refill and restores
    /// the burst bucket once its window has elapsed.
    pub fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        let interval = config.sustained_refill_interval.as_millis();
        if interval > 0 {
            let elapsed = now.saturating_duration_since(self.last_sustained_refill).as_millis();
            let earned = elapsed / interval;
            if earned > 0 {
                let earned = u32::try_from(earned).unwrap_or(u32::MAX);
                self.sustained_tokens = self
                    .sustained_tokens
                    .saturating_add(earned)
                    .min(config.sustained_capacity);
                self.last_sustained_refill = now;
            }
        }

        if now.saturating_duration_since(self.last_burst_refill) >= config.burst_window {
            self.burst_tokens = config.burst_capacity;
            self.last_burst_refill = now;
        }
    }

    /// Takes one token, burst first, and reports the result.
    pub fn try_consume(&mut self, config: &RateLimitConfig, now: Instant) -> RateLimitDecision {
        let (allowed, reset) = if self.burst_tokens > 0 {
            self.burst_tokens -= 1;
            let since = now.saturating_duration_since(self.last_burst_refill);
            (true, config.burst_window.saturating_sub(since))
        } else if self.sustained_tokens > 0 {
            self.sustained_tokens -= 1;
            (true, config.sustained_refill_interval)
        } else {
            let since = now.saturating_duration_since(self.last_sustained_refill);
            (false, config.sustained_refill_interval.saturating_sub(since))
        };

        RateLimitDecision {
            allowed,
            limit: config.sustained_capacity,
            remaining: self.sustained_tokens,
            burst_remaining: self.burst_tokens,
            reset_in_seconds: ceil_secs(reset),
        }
    }

    /// Whether the bucket has gone without a sustained refill for `stale_after`.
    pub fn is_stale(&self, stale_after: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_sustained_refill) > stale_after
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

//! Rate Limiter
//!
//! Per-identity dual token bucket with an idle-bucket sweep.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::RateLimitConfig;
use crate::rate_limit::{RateLimitBucket, RateLimitDecision};
use crate::tasks::PeriodicTask;

type BucketMap = Arc<Mutex<HashMap<String, RateLimitBucket>>>;

// == Rate Limiter ==
/// Admission control keyed by caller identity.
///
/// Each identity gets a sustained bucket that bounds its long-run rate and a
/// burst bucket that absorbs short spikes. Buckets are created on first sight
/// and reclaimed by a background sweep once idle for `stale_after`.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: BucketMap,
    config: RateLimitConfig,
    sweeper: Mutex<Option<PeriodicTask>>,
}

impl RateLimiter {
    // == Constructor ==
    /// Builds the limiter and starts its idle sweep on the current tokio runtime.
    pub fn new(config: RateLimitConfig) -> Self {
        let buckets: BucketMap = Arc::default();

        let swept = buckets.clone();
        let stale_after = config.stale_after;
        let sweeper = PeriodicTask::spawn("rate limit sweep", config.sweep_interval, move || {
            let removed = purge(&swept, stale_after, Instant::now());
            if removed > 0 {
                info!("Rate limit sweep: dropped {} idle buckets", removed);
            } else {
                debug!("Rate limit sweep: no idle buckets found");
            }
        });

        Self {
            buckets,
            config,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    // == Consume ==
    /// Refills the caller's buckets and tries to take one token.
    ///
    /// The whole read-refill-consume step runs under one lock, so concurrent
    /// calls for the same identity never double-spend.
    pub fn consume(&self, identity: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();

        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitBucket::full(&self.config, now));
        bucket.refill(&self.config, now);
        let decision = bucket.try_consume(&self.config, now);

        if !decision.allowed {
            debug!(
                "Rate limit exceeded for {}, reset in {}s",
                identity, decision.reset_in_seconds
            );
        }
        decision
    }

    // == Peek ==
    /// Current token counts for an identity without consuming or refilling.
    pub fn peek(&self, identity: &str) -> Option<(u32, u32)> {
        self.buckets
            .lock()
            .get(identity)
            .map(|bucket| (bucket.sustained_tokens, bucket.burst_tokens))
    }

    // == Purge Stale ==
    /// Drops buckets idle longer than `stale_after`. Returns how many went.
    pub fn purge_stale(&self) -> usize {
        purge(&self.buckets, self.config.stale_after, Instant::now())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    // == Shutdown ==
    /// Stops the idle sweep. `consume` keeps working.
    pub fn shutdown(&self) {
        if let Some(task) = self.sweeper.lock().take() {
            task.stop();
        }
    }
}

fn purge(buckets: &BucketMap, stale_after: std::time::Duration, now: Instant) -> usize {
    let mut buckets = buckets.lock();
    let before = buckets.len();
    buckets.retain(|_, bucket| !bucket.is_stale(stale_after, now));
    before - buckets.len()
}

//! Admission Facade
//!
//! Composes the rate limiter, cache and dedup queue into one request path:
//! consume a token, try the cache, otherwise fetch once and cache the result.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::cache::{Cache, CacheStats};
use crate::config::{Config, RateLimitConfig};
use crate::error::FetchError;
use crate::queue::{DedupQueue, QueueStatus};
use crate::rate_limit::{RateLimitDecision, RateLimiter};

// == Lookup ==
/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

impl Lookup {
    /// Value for the `X-Cache` header.
    pub fn as_header(self) -> &'static str {
        match self {
            Lookup::Hit => "HIT",
            Lookup::Miss => "MISS",
        }
    }
}

// == Admitted ==
/// Result of running one request through the facade.
#[derive(Debug, Clone, PartialEq)]
pub enum Admitted<V> {
    /// The caller is over its rate limit; nothing else was consulted.
    Rejected(RateLimitDecision),
    /// The request went through. `value` is `None` when the store has no
    /// record for the key.
    Served {
        value: Option<V>,
        lookup: Lookup,
        rate: RateLimitDecision,
        elapsed: Duration,
    },
    /// The caller was charged a token but the fetch failed. Nothing was
    /// cached.
    Failed {
        error: FetchError,
        rate: RateLimitDecision,
    },
}

// == Admission ==
/// Owns one instance of each component and their background sweeps.
#[derive(Debug)]
pub struct Admission<V> {
    cache: Cache<V>,
    limiter: RateLimiter,
    queue: DedupQueue<Option<V>>,
}

impl<V: Clone + Send + 'static> Admission<V> {
    // == Constructor ==
    /// Builds all components from configuration and starts their sweeps.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: Cache::new(&config.cache),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            queue: DedupQueue::new(&config.queue),
        }
    }

    // == Admit ==
    /// Runs one request for `key` on behalf of `identity`.
    ///
    /// `fetch` is only called on a cache miss, and then at most once per key
    /// no matter how many callers are waiting on it. Found values are cached;
    /// not-found results and failures are not. Every outcome carries the rate
    /// limit decision it was charged against.
    pub async fn admit<F, Fut>(&self, identity: &str, key: &str, fetch: F) -> Admitted<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<V>, FetchError>> + Send + 'static,
    {
        let started = Instant::now();

        let rate = self.limiter.consume(identity);
        if !rate.allowed {
            return Admitted::Rejected(rate);
        }

        if let Some(value) = self.cache.get(key) {
            return self.served(Some(value), Lookup::Hit, rate, started);
        }

        let value = match self.queue.execute(key, fetch).await {
            Ok(value) => value,
            Err(error) => return Admitted::Failed { error, rate },
        };
        if let Some(found) = &value {
            self.cache.set(key, found.clone());
        }
        self.served(value, Lookup::Miss, rate, started)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    pub fn rate_limit_config(&self) -> &RateLimitConfig {
        self.limiter.config()
    }

    /// Empties the cache and resets its statistics.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn served(
        &self,
        value: Option<V>,
        lookup: Lookup,
        rate: RateLimitDecision,
        started: Instant,
    ) -> Admitted<V> {
        let elapsed = started.elapsed();
        self.cache.record_response_time(elapsed.as_secs_f64() * 1000.0);
        Admitted::Served {
            value,
            lookup,
            rate,
            elapsed,
        }
    }
}

impl<V> Admission<V> {
    // == Shutdown ==
    /// Stops the cache and rate limiter sweeps.
    pub fn shutdown(&self) {
        self.cache.shutdown();
        self.limiter.shutdown();
        info!("Admission sweeps stopped");
    }
}

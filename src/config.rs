//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Cache Config ==
/// Parameters of the LRU/TTL cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Absolute time-to-live of every entry
    pub ttl: Duration,
    /// Interval between eager expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

// == Rate Limit Config ==
/// Parameters of the dual token bucket.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Tokens in the sustained bucket when full
    pub sustained_capacity: u32,
    /// Time to earn back one sustained token
    pub sustained_refill_interval: Duration,
    /// Tokens in the burst bucket when full
    pub burst_capacity: u32,
    /// Window after which the burst bucket is fully restored
    pub burst_window: Duration,
    /// Interval between idle-bucket sweeps
    pub sweep_interval: Duration,
    /// Buckets idle longer than this are dropped by the sweep
    pub stale_after: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sustained_capacity: 10,
            sustained_refill_interval: Duration::from_millis(6_000),
            burst_capacity: 5,
            burst_window: Duration::from_millis(10_000),
            sweep_interval: Duration::from_secs(60),
            stale_after: Duration::from_secs(300),
        }
    }
}

// == Queue Config ==
/// Parameters of the deduplicating request queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum fetches running at once across all keys
    pub concurrency_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 10,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub queue: QueueConfig,
    /// Simulated latency of the backing store lookup
    pub store_latency: Duration,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `CACHE_TTL` - Entry TTL in seconds (default: 60)
    /// - `CACHE_SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 10)
    /// - `RATE_SUSTAINED_CAPACITY` - Sustained bucket size (default: 10)
    /// - `RATE_SUSTAINED_REFILL_MS` - Milliseconds per sustained token (default: 6000)
    /// - `RATE_BURST_CAPACITY` - Burst bucket size (default: 5)
    /// - `RATE_BURST_WINDOW_MS` - Burst window in milliseconds (default: 10000)
    /// - `RATE_SWEEP_INTERVAL` - Idle bucket sweep frequency in seconds (default: 60)
    /// - `RATE_STALE_AFTER` - Idle bucket lifetime in seconds (default: 300)
    /// - `QUEUE_CONCURRENCY_LIMIT` - Concurrent fetch cap (default: 10)
    /// - `STORE_LATENCY_MS` - Simulated store latency (default: 200)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig {
                max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache.max_entries),
                ttl: secs_or("CACHE_TTL", defaults.cache.ttl),
                sweep_interval: secs_or("CACHE_SWEEP_INTERVAL", defaults.cache.sweep_interval),
            },
            rate_limit: RateLimitConfig {
                sustained_capacity: env_or(
                    "RATE_SUSTAINED_CAPACITY",
                    defaults.rate_limit.sustained_capacity,
                ),
                sustained_refill_interval: millis_or(
                    "RATE_SUSTAINED_REFILL_MS",
                    defaults.rate_limit.sustained_refill_interval,
                ),
                burst_capacity: env_or("RATE_BURST_CAPACITY", defaults.rate_limit.burst_capacity),
                burst_window: millis_or("RATE_BURST_WINDOW_MS", defaults.rate_limit.burst_window),
                sweep_interval: secs_or("RATE_SWEEP_INTERVAL", defaults.rate_limit.sweep_interval),
                stale_after: secs_or("RATE_STALE_AFTER", defaults.rate_limit.stale_after),
            },
            queue: QueueConfig {
                concurrency_limit: env_or(
                    "QUEUE_CONCURRENCY_LIMIT",
                    defaults.queue.concurrency_limit,
                ),
            },
            store_latency: millis_or("STORE_LATENCY_MS", defaults.store_latency),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            queue: QueueConfig::default(),
            store_latency: Duration::from_millis(200),
            server_port: 3000,
        }
    }
}

// == Env Helpers ==
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn secs_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn millis_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

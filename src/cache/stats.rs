//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! caller-reported response times.

use std::collections::VecDeque;

use serde::Serialize;

/// Maximum number of response-time samples kept for the rolling average
pub const MAX_RESPONSE_SAMPLES: usize = 1000;

// == Counters ==
/// Mutable hit/miss/eviction counters owned by the store.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}

// == Response Times ==
/// Bounded FIFO log of response times in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct ResponseTimes {
    samples: VecDeque<f64>,
}

impl ResponseTimes {
    /// Appends a sample, dropping the oldest once the log is full.
    pub fn record(&mut self, millis: f64) {
        if self.samples.len() == MAX_RESPONSE_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(millis);
    }

    /// Mean of the retained samples, 0.0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of cache performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Current number of entries in the cache
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
    /// Configured TTL in whole seconds
    pub ttl_seconds: u64,
    /// Mean of the recorded response times in milliseconds
    pub avg_response_time: f64,
    /// `hits + misses`
    pub total_requests: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }
}

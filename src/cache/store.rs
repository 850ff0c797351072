//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::lru::{LruList, NodeId};
use crate::cache::stats::{Counters, ResponseTimes};
use crate::cache::{CacheEntry, CacheStats};

#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    node: NodeId,
}

// == LRU Cache ==
/// Bounded cache with LRU eviction and an absolute TTL.
///
/// This is the single-threaded core; [`crate::cache::Cache`] wraps it in a
/// lock and owns the periodic sweep.
#[derive(Debug)]
pub struct LruCache<V> {
    /// Key to entry and list position
    slots: HashMap<String, Slot<V>>,
    /// Recency order
    lru: LruList,
    counters: Counters,
    response_times: ResponseTimes,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Maximum age of a servable entry
    ttl: Duration,
}

impl<V: Clone> LruCache<V> {
    // == Constructor ==
    /// Creates a new LruCache with the given capacity and TTL.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            slots: HashMap::with_capacity(max_entries),
            lru: LruList::new(),
            counters: Counters::default(),
            response_times: ResponseTimes::default(),
            max_entries,
            ttl,
        }
    }

    // == Get ==
    /// Retrieves a live value, marking it most recently used.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        if !self.evict_if_expired(key, now) {
            if let Some(slot) = self.slots.get_mut(key) {
                slot.entry.record_access();
                self.lru.move_to_back(slot.node);
                self.counters.record_hit();
                return Some(slot.entry.value.clone());
            }
        }

        self.counters.record_miss();
        None
    }

    // == Set ==
    /// Stores a value, replacing any previous one under the same key.
    ///
    /// If the key is new and the cache is at capacity, the least recently used
    /// entry is evicted first.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(slot) = self.slots.get_mut(&key) {
            slot.entry = CacheEntry::new(value);
            self.lru.move_to_back(slot.node);
            return;
        }

        if self.slots.len() >= self.max_entries {
            if let Some(evicted) = self.lru.pop_front() {
                self.slots.remove(&evicted);
                self.counters.record_eviction();
            }
        }

        let node = self.lru.push_back(key.clone());
        self.slots.insert(
            key,
            Slot {
                entry: CacheEntry::new(value),
                node,
            },
        );
    }

    // == Has ==
    /// Checks for a live entry without touching recency or counters.
    pub fn has(&mut self, key: &str) -> bool {
        !self.evict_if_expired(key, Instant::now()) && self.slots.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.slots.remove(key) {
            Some(slot) => {
                self.lru.remove(slot.node);
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Drops every entry and resets all statistics.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.lru.clear();
        self.counters = Counters::default();
        self.response_times.clear();
    }

    // == Record Response Time ==
    pub fn record_response_time(&mut self, millis: f64) {
        self.response_times.record(millis);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits,
            misses: self.counters.misses,
            evictions: self.counters.evictions,
            size: self.slots.len(),
            max_size: self.max_entries,
            ttl_seconds: self.ttl.as_secs(),
            avg_response_time: self.response_times.average(),
            total_requests: self.counters.hits + self.counters.misses,
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired(ttl, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.delete(key);
        }
        expired.len()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Access count of a live entry, for inspection.
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.entry.access_count)
    }

    /// Deletes `key` if it has expired. Returns true when something was removed.
    fn evict_if_expired(&mut self, key: &str, now: Instant) -> bool {
        let expired = self
            .slots
            .get(key)
            .is_some_and(|slot| slot.entry.is_expired(self.ttl, now));
        if expired {
            self.delete(key);
        }
        expired
    }
}

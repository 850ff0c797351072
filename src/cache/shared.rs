//! Shared Cache Module
//!
//! Thread-safe cache handle that owns its periodic expiry sweep.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheStats, LruCache};
use crate::config::CacheConfig;
use crate::tasks::PeriodicTask;

// == Cache ==
/// Lock-guarded [`LruCache`] plus the background task that purges expired
/// entries every `sweep_interval`.
///
/// The sweep only reclaims memory early; `get` and `has` never return an
/// expired value whether or not it has run.
#[derive(Debug)]
pub struct Cache<V> {
    store: Arc<Mutex<LruCache<V>>>,
    sweeper: Mutex<Option<PeriodicTask>>,
}

impl<V: Clone + Send + 'static> Cache<V> {
    // == Constructor ==
    /// Builds the cache and starts its sweep on the current tokio runtime.
    pub fn new(config: &CacheConfig) -> Self {
        let store = Arc::new(Mutex::new(LruCache::new(config.max_entries, config.ttl)));

        let swept = store.clone();
        let sweeper = PeriodicTask::spawn("cache sweep", config.sweep_interval, move || {
            let removed = swept.lock().purge_expired();
            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        });

        Self {
            store,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.store.lock().get(key)
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.store.lock().set(key, value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.lock().delete(key)
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn record_response_time(&self, millis: f64) {
        self.store.lock().record_response_time(millis);
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Whether the background sweep is still scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl<V> Cache<V> {
    // == Shutdown ==
    /// Stops the background sweep. The cache itself stays usable.
    pub fn shutdown(&self) {
        if let Some(task) = self.sweeper.lock().take() {
            task.stop();
        }
    }
}

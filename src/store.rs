//! Mock Backing Store
//!
//! A seeded user table whose lookups take a fixed, simulated latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;
use crate::models::User;

// == User Store ==
/// Slow read-only lookup store. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct UserStore {
    users: Arc<HashMap<u64, User>>,
    latency: Duration,
    lookups: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl UserStore {
    /// Creates a store seeded with a handful of users.
    pub fn seeded(latency: Duration) -> Self {
        let users = [
            (1, "Alice Martin", "alice@example.com"),
            (2, "Bruno Costa", "bruno@example.com"),
            (3, "Chen Wei", "chen@example.com"),
            (4, "Dana Okafor", "dana@example.com"),
            (5, "Emil Novak", "emil@example.com"),
        ]
        .into_iter()
        .map(|(id, name, email)| (id, User::new(id, name, email)))
        .collect();

        Self {
            users: Arc::new(users),
            latency,
            lookups: Arc::default(),
            failing: Arc::default(),
        }
    }

    // == Find ==
    /// Looks a user up after the simulated latency.
    ///
    /// `Ok(None)` means the id is unknown.
    pub async fn find(&self, id: u64) -> Result<Option<User>, FetchError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Failed("user store unavailable".to_string()));
        }

        debug!("Store lookup for user {}", id);
        Ok(self.users.get(&id).cloned())
    }

    /// Number of lookups that reached the store.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Makes every following lookup fail, or stop failing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

//! Deduplicating Request Queue
//!
//! Coalesces concurrent requests for the same key into one fetch and caps how
//! many fetches run at once across all keys.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::error::FetchError;
use crate::queue::QueueStatus;

type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send>>;
type Waiter<T> = oneshot::Sender<Result<T, FetchError>>;
type SharedState<T> = Arc<Mutex<QueueState<T>>>;

struct PendingTask<T> {
    key: String,
    fetch: FetchFuture<T>,
}

struct QueueState<T> {
    /// Callers waiting on each key's fetch, in attachment order
    in_flight: HashMap<String, Vec<Waiter<T>>>,
    /// Fetches waiting for a concurrency slot, oldest first
    pending: VecDeque<PendingTask<T>>,
    /// Fetches currently running
    active: usize,
}

// == Dedup Queue ==
/// Single-flight executor with a global concurrency cap.
///
/// A key moves `absent -> in flight -> absent`; there is no completed state
/// here, so caching successful results is up to the caller. Failures reach
/// every coalesced caller and are never retried.
pub struct DedupQueue<T> {
    state: SharedState<T>,
    concurrency_limit: usize,
}

impl<T> std::fmt::Debug for DedupQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DedupQueue")
            .field("concurrency_limit", &self.concurrency_limit)
            .field("queue_length", &state.pending.len())
            .field("active_count", &state.active)
            .finish()
    }
}

impl<T: Clone + Send + 'static> DedupQueue<T> {
    // == Constructor ==
    /// Creates an empty queue. A zero limit is treated as one.
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                in_flight: HashMap::new(),
                pending: VecDeque::new(),
                active: 0,
            })),
            concurrency_limit: config.concurrency_limit.max(1),
        }
    }

    // == Execute ==
    /// Runs `fetch` for `key` unless a fetch for that key is already queued or
    /// running, in which case the caller waits for that one instead.
    ///
    /// `fetch` is only invoked once a concurrency slot is free.
    pub async fn execute<F, Fut>(&self, key: impl Into<String>, fetch: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let key = key.into();
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.state.lock();
            if let Some(waiters) = state.in_flight.get_mut(&key) {
                waiters.push(tx);
                debug!("Coalesced request for {} ({} waiting)", key, waiters.len());
            } else {
                // Registered before it can run, so later callers join it
                state.in_flight.insert(key.clone(), vec![tx]);
                state.pending.push_back(PendingTask {
                    key,
                    fetch: Box::pin(async move { fetch().await }),
                });
                start_ready(&self.state, &mut state, self.concurrency_limit);
            }
        }

        rx.await.unwrap_or(Err(FetchError::Aborted))
    }

    // == Status ==
    /// Live snapshot of queued, running and in-flight work.
    pub fn status(&self) -> QueueStatus {
        let state = self.state.lock();
        let mut in_flight_keys: Vec<String> = state.in_flight.keys().cloned().collect();
        in_flight_keys.sort();

        QueueStatus {
            queue_length: state.pending.len(),
            active_count: state.active,
            in_flight_keys,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }
}

/// Starts pending tasks while there is spare capacity.
fn start_ready<T: Clone + Send + 'static>(
    shared: &SharedState<T>,
    state: &mut QueueState<T>,
    limit: usize,
) {
    while state.active < limit {
        let Some(task) = state.pending.pop_front() else {
            break;
        };
        state.active += 1;
        tokio::spawn(run(shared.clone(), task, limit));
    }
}

async fn run<T: Clone + Send + 'static>(shared: SharedState<T>, task: PendingTask<T>, limit: usize) {
    let PendingTask { key, fetch } = task;

    // The fetch gets its own task so a panic settles the group instead of
    // leaving the key in flight forever.
    let outcome = match tokio::spawn(fetch).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("Fetch for {} did not complete: {}", key, err);
            Err(FetchError::Aborted)
        }
    };
    if let Err(FetchError::Failed(reason)) = &outcome {
        warn!("Fetch for {} failed: {}", key, reason);
    }

    // Unregister before delivering so a caller arriving now starts a new fetch
    let waiters = {
        let mut state = shared.lock();
        state.active -= 1;
        let waiters = state.in_flight.remove(&key).unwrap_or_default();
        start_ready(&shared, &mut state, limit);
        waiters
    };

    debug!("Fetch for {} settled, notifying {} callers", key, waiters.len());
    for waiter in waiters {
        // A caller that stopped waiting has dropped its receiver
        let _ = waiter.send(outcome.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn queue<T: Clone + Send + 'static>(limit: usize) -> Arc<DedupQueue<T>> {
        Arc::new(DedupQueue::new(&QueueConfig {
            concurrency_limit: limit,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let queue = queue::<String>(10);
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let queue = queue.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    queue
                        .execute("user:1", move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            Ok("alice".to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok("alice".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(queue.status().in_flight_keys.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_is_respected() {
        let queue = queue::<usize>(10);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..15)
            .map(|i| {
                let queue = queue.clone();
                let running = running.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    queue
                        .execute(format!("user:{}", i), move || async move {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok(i)
                        })
                        .await
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let status = queue.status();
        assert_eq!(status.active_count, 10);
        assert_eq!(status.queue_length, 5);
        assert_eq!(status.in_flight_keys.len(), 15);

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Ok(i));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 10);

        let status = queue.status();
        assert_eq!((status.active_count, status.queue_length), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_tasks_start_in_fifo_order() {
        let queue = queue::<()>(1);
        let started = Arc::new(Mutex::new(Vec::new()));

        let fetch = |name: &'static str| {
            let started = started.clone();
            move || async move {
                started.lock().push(name);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            }
        };

        let (a, b, c) = tokio::join!(
            queue.execute("a", fetch("a")),
            queue.execute("b", fetch("b")),
            queue.execute("c", fetch("c")),
        );

        assert_ok!(a);
        assert_ok!(b);
        assert_ok!(c);
        assert_eq!(*started.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_every_waiter_and_frees_key() {
        let queue = queue::<String>(10);
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = {
            let calls = calls.clone();
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err(FetchError::Failed("store unavailable".to_string()))
            }
        };
        let joining = || async { Ok("never used".to_string()) };

        let (first, second, third) = tokio::join!(
            queue.execute("user:7", failing),
            queue.execute("user:7", joining),
            queue.execute("user:7", joining),
        );

        let expected = Err(FetchError::Failed("store unavailable".to_string()));
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(third, expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(queue.status().in_flight_keys.is_empty());

        // Nothing is stuck: a fresh call runs a fresh fetch
        let retry = queue
            .execute("user:7", || async { Ok("recovered".to_string()) })
            .await;
        assert_eq!(retry, Ok("recovered".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_key_leaves_in_flight_map_before_callers_wake() {
        let queue = queue::<usize>(10);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = |calls: &Arc<AtomicUsize>| {
            let calls = calls.clone();
            move || async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            }
        };

        let first = queue.execute("user:1", counted(&calls)).await;
        let in_flight_at_wake = queue.status().in_flight_keys;
        let second = queue.execute("user:1", counted(&calls)).await;

        assert_eq!(first, Ok(1));
        assert!(in_flight_at_wake.is_empty());
        // Joining from the continuation starts a fresh fetch
        assert_eq!(second, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_notified_in_attachment_order() {
        let queue = queue::<u32>(10);
        let woke = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for name in ["first", "second", "third", "fourth"] {
            let queue = queue.clone();
            let woke = woke.clone();
            handles.push(tokio::spawn(async move {
                let value = queue
                    .execute("user:2", || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(7)
                    })
                    .await;
                woke.lock().push(name);
                value
            }));
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.status().in_flight_keys, vec!["user:2".to_string()]);

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(7));
        }
        assert_eq!(*woke.lock(), vec!["first", "second", "third", "fourth"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_fetch_settles_as_aborted() {
        let queue = queue::<u32>(2);

        async fn explode() -> Result<u32, FetchError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            panic!("fetch exploded")
        }

        let (first, second) = tokio::join!(
            queue.execute("boom", explode),
            queue.execute("boom", || async { Ok(1) }),
        );

        assert_eq!(first, Err(FetchError::Aborted));
        assert_eq!(second, Err(FetchError::Aborted));
        assert_eq!(queue.status().active_count, 0);

        let value = queue.execute("boom", || async { Ok(2) }).await;
        assert_eq!(assert_ok!(value), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_fetch_again() {
        let queue = queue::<usize>(10);
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let calls = calls.clone();
            let value = queue
                .execute("post:1", move || async move {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
                })
                .await;
            assert_eq!(value, Ok(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_not_invoked_until_slot_frees() {
        let queue = queue::<()>(1);
        let second_started = Arc::new(AtomicUsize::new(0));

        let blocker = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .execute("slow", || async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok(())
                    })
                    .await
            }
        });
        tokio::task::yield_now().await;
        let waiting = tokio::spawn({
            let queue = queue.clone();
            let second_started = second_started.clone();
            async move {
                queue
                    .execute("other", move || async move {
                        second_started.fetch_add(1, Ordering::SeqCst);
                        Err(FetchError::Failed("no such record".to_string()))
                    })
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(second_started.load(Ordering::SeqCst), 0);
        assert_eq!(queue.status().queue_length, 1);

        assert_ok!(blocker.await.unwrap());
        assert_err!(waiting.await.unwrap());
        assert_eq!(second_started.load(Ordering::SeqCst), 1);
    }
}

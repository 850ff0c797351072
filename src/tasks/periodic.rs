//! Periodic Task
//!
//! A cancelable background loop used by the cache and rate limiter sweeps.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// Shortest interval a periodic task will run at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

// == Periodic Task ==
/// Handle to a background loop that calls `tick` once per interval.
///
/// The loop sleeps first, then ticks, forever. It stops when [`stop`] is
/// called or when the handle is dropped, so an owning component cannot leak
/// its sweep.
///
/// [`stop`]: PeriodicTask::stop
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns the loop on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            info!("Starting {} task with interval of {:?}", name, interval);

            loop {
                tokio::time::sleep(interval).await;
                tick();
            }
        });

        Self { name, handle }
    }

    // == Stop ==
    /// Aborts the loop. Calling it more than once is harmless.
    pub fn stop(&self) {
        if !self.handle.is_finished() {
            self.handle.abort();
            info!("{} task stopped", self.name);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        task.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticking() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        task.stop();
        task.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(task.is_finished(), "Task should be finished after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_task() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(task);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}

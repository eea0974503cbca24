//! Tracked background refreshes.
//!
//! A cache hit returns immediately and leaves a refresh task behind. The
//! task's failure never reaches the caller; it is logged and dropped here.
//! Tasks are kept in a `JoinSet` so shutdown and tests can wait for them.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lownet_core::Error;
use tokio::task::JoinSet;

/// Owner of every in-flight background refresh.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    tasks: Mutex<JoinSet<()>>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a refresh on the current runtime. Errors are swallowed.
    pub fn spawn<F>(&self, label: String, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match task.await {
                Ok(()) => tracing::debug!(request = %label, "background refresh finished"),
                Err(e) => tracing::debug!(request = %label, error = %e, "background refresh failed"),
            }
        });
    }

    /// Number of refreshes spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every refresh spawned so far, including ones spawned while
    /// waiting. Returns how many were awaited.
    ///
    /// Each batch is taken out of the tracker while it is awaited, so
    /// [`RefreshTracker::in_flight`] does not count it during the wait.
    /// Dropping the returned future aborts the refreshes of the batch in hand.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return settled;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "background refresh task aborted");
                }
                settled += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_settle_waits_for_all() {
        let tracker = RefreshTracker::new();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let done = done.clone();
            tracker.spawn(format!("GET /{i}"), async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        // Single-threaded test runtime: no task runs before settle, so spawn reaps none.
        assert_eq!(tracker.in_flight(), 3);
        let settled = tracker.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(settled, 3);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let tracker = RefreshTracker::new();
        tracker.spawn("GET /".into(), async { Err(Error::Network("connection reset".into())) });

        assert_eq!(tracker.settle().await, 1);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_settle_empty() {
        let tracker = RefreshTracker::new();
        assert_eq!(tracker.settle().await, 0);
    }
}

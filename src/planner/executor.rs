//! Concurrent execution of independent remote writes.
//!
//! All writes of one batch are issued concurrently, bounded by a limit.
//! The first failure ends the batch: writes still in flight are dropped,
//! writes that already succeeded are not rolled back, and the error is
//! returned to the caller.

use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::Result;

/// Default number of writes in flight per batch.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Executor for batches of independent writes.
#[derive(Debug, Clone, Copy)]
pub struct WriteExecutor {
    /// Maximum writes in flight.
    concurrency: usize,
}

impl WriteExecutor {
    /// Creates an executor with the given concurrency limit (at least one).
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self {
            concurrency: if concurrency == 0 { 1 } else { concurrency },
        }
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `op` for every item concurrently and returns how many succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `op`; remaining writes are cancelled.
    pub async fn run<'a, T, F, Fut>(&self, items: &'a [T], op: F) -> Result<usize>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if items.is_empty() {
            return Ok(0);
        }

        debug!(
            "Issuing {} writes with concurrency {}",
            items.len(),
            self.concurrency
        );

        let done: Vec<()> = stream::iter(items.iter().map(op))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        Ok(done.len())
    }
}

impl Default for WriteExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GitHubError, GorcError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_every_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = vec![1, 2, 3, 4, 5];

        let executor = WriteExecutor::new(2);
        let done = executor
            .run(&items, |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .expect("batch should succeed");

        assert_eq!(done, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let items: Vec<u8> = vec![];
        let done = WriteExecutor::default()
            .run(&items, |_| async { Ok(()) })
            .await
            .expect("empty batch should succeed");
        assert_eq!(done, 0);
    }

    #[tokio::test]
    async fn test_first_failure_cancels_batch() {
        let finished = Arc::new(AtomicUsize::new(0));
        let items = vec![0_u64, 50, 50, 50];

        let result = WriteExecutor::new(4)
            .run(&items, |delay| {
                let finished = Arc::clone(&finished);
                let delay = *delay;
                async move {
                    if delay == 0 {
                        return Err(GorcError::from(GitHubError::api_error(422, "rejected")));
                    }
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(GorcError::GitHub(GitHubError::ApiRequestFailed { status: 422, .. }))
        ));
        // Slow writes were dropped when the batch failed.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(WriteExecutor::new(0).concurrency(), 1);
    }
}

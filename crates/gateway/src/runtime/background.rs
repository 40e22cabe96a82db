//! Detached jobs that outlive the request that scheduled them.
//!
//! Persistence and memory write-back must never block or fail the client
//! stream, so they are handed to a `TaskTracker`. Failures are logged here
//! and go nowhere else. Shutdown drains the tracker so in-flight writes
//! finish before the process exits.

use std::future::Future;

use tokio_util::task::TaskTracker;

use super::error::RunError;

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `job` on the current runtime. Never fails: if no runtime is
    /// available the job is dropped and the failure is logged.
    pub fn spawn<F>(&self, name: &'static str, job: F)
    where
        F: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(e) => {
                tracing::error!(task = name, error = %e, "could not schedule background task");
                return;
            }
        };

        self.tracker.spawn_on(
            async move {
                if let Err(e) = job.await {
                    tracing::warn!(task = name, error = %e, "background task failed");
                }
            },
            &handle,
        );
    }

    /// Number of jobs still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait for every scheduled job to finish. New jobs may be scheduled
    /// again afterwards.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn drain_waits_for_jobs() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            tasks.spawn("count", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn failing_job_does_not_affect_others() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        tasks.spawn("fail", async { Err(RunError::BackgroundWrite("disk full".into())) });
        let d = done.clone();
        tasks.spawn("ok", async move {
            d.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);

        // Still usable after a drain.
        let d = done.clone();
        tasks.spawn("again", async move {
            d.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn spawn_without_runtime_is_logged_not_panicking() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("orphan", async { Ok(()) });
        assert!(tasks.is_empty());
    }
}

//! Detached background work.
//!
//! Cache writes that must not hold up a response are spawned here. The group
//! is independent of any request: dropping the request future does not abort
//! what was spawned. Shutdown closes the group and waits for it to drain.

use std::future::Future;
use tokio_util::task::TaskTracker;
use tracing::{error, Instrument};

use crate::error::StoreError;

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a best-effort store write. Failures are logged with `what`
    /// and otherwise dropped.
    pub fn spawn_write<F>(&self, what: &'static str, write: F)
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let span = tracing::Span::current();
        self.tracker.spawn(
            async move {
                if let Err(e) = write.await {
                    error!("failed to {}: {}", what, e);
                }
            }
            .instrument(span),
        );
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting work and waits for everything already spawned.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Waits for everything spawned so far without closing the group.
    pub async fn settle(&self) {
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
    async fn settle_waits_for_spawned_writes() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            tasks.spawn_write("count", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_write_does_not_poison_the_group() {
        let tasks = BackgroundTasks::new();
        tasks.spawn_write("fail", async { Err(StoreError::Backend("down".into())) });
        tasks.settle().await;

        let done = Arc::new(AtomicUsize::new(0));
        let counter = done.clone();
        tasks.spawn_write("after", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}

use crate::{Chunk, DrainReport, PoolStatus, Result, UploadError, UploadFailure, pool::WorkerPool};
use std::sync::Arc;
use tokio::{runtime::Handle, sync::oneshot};
use tokio_util::task::TaskTracker;

/// Supervised group of per-chunk submission tasks feeding a [`WorkerPool`].
///
/// Each chunk gets its own short-lived task, so the caller of
/// [`Streamer::process`](crate::Streamer::process) never waits for pool
/// capacity. Tasks are chained: each one waits until its predecessor has
/// placed its chunk in the queue, so chunks enter the pool in order even
/// though the tasks themselves run concurrently.
pub(super) struct SubmissionQueue {
    pool: Arc<WorkerPool>,
    runtime: Handle,
    tracker: TaskTracker,
    last_submitted: Option<oneshot::Receiver<()>>,
}

impl SubmissionQueue {
    pub(super) fn new(pool: WorkerPool, runtime: Handle) -> Self {
        Self {
            pool: Arc::new(pool),
            runtime,
            tracker: TaskTracker::new(),
            last_submitted: None,
        }
    }

    /// Spawns the submission task for `chunk`. Does not wait.
    pub(super) fn submit(&mut self, chunk: Chunk) {
        let (submitted_tx, submitted_rx) = oneshot::channel();
        let previous = self.last_submitted.replace(submitted_rx);
        let pool = Arc::clone(&self.pool);

        self.tracker.spawn_on(
            async move {
                if let Some(previous) = previous {
                    // An error only means the previous task is gone, which
                    // still frees this one to go next.
                    let _ = previous.await;
                }

                let order = chunk.order();
                if let Err(e) = pool.submit(chunk).await {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Failed to submit chunk {order}: {e}");

                    pool.record_failure(UploadFailure {
                        order,
                        attempts: 0,
                        error: UploadError::new(format!("not submitted: {e}")),
                    });
                }

                let _ = submitted_tx.send(());
            },
            &self.runtime,
        );
    }

    pub(super) fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub(super) fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Waits for every submission task, then drains the pool.
    pub(super) async fn drain(self) -> Result<DrainReport> {
        self.tracker.close();
        self.tracker.wait().await;
        self.pool.shutdown().await
    }
}

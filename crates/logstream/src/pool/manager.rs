//! Asynchronous worker pool for chunk uploads.
//!
//! This module defines the [`WorkerPool`] struct, which owns the sending half
//! of the bounded queue shared by every worker. Any idle worker takes the next
//! request, so a slow upload never holds back chunks queued behind it.
//!
//! Shutdown is a drain, not a cancellation: one [`WorkRequest::Shutdown`] per
//! worker is queued *behind* every pending upload, and the pool waits for all
//! acknowledgements.

use super::{request::WorkRequest, stats::PoolStats, worker::worker_loop};
use crate::{Chunk, Client, DrainReport, Error, PoolStatus, Result, StreamerConfig, UploadFailure};
use std::sync::Arc;
use tokio::{
    runtime::Handle,
    sync::{Mutex, mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;

/// A fixed set of asynchronous workers consuming one bounded upload queue.
pub(crate) struct WorkerPool {
    queue: mpsc::Sender<WorkRequest>,
    num_workers: usize,
    stats: Arc<PoolStats>,
    shutdown_token: CancellationToken,
    ticker_token: CancellationToken,
}

impl WorkerPool {
    /// Validates `config` and spawns `config.concurrency` workers on
    /// `runtime`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` cannot build a pool.
    pub(crate) fn spawn(
        config: &StreamerConfig,
        client: Arc<dyn Client>,
        failure_tx: Option<mpsc::UnboundedSender<UploadFailure>>,
        runtime: &Handle,
    ) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(PoolStats::new(failure_tx));

        for worker_id in 0..config.concurrency {
            runtime.spawn(worker_loop(
                worker_id,
                Arc::clone(&rx),
                Arc::clone(&client),
                config.retry,
                Arc::clone(&stats),
            ));
        }

        let ticker_token = CancellationToken::new();

        #[cfg(feature = "tracing")]
        runtime.spawn(liveness_ticker(
            config.pool_tick_interval,
            Arc::clone(&stats),
            ticker_token.clone(),
        ));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Started worker pool with {} workers (queue capacity {})",
            config.concurrency,
            config.queue_capacity
        );

        Ok(Self {
            queue: tx,
            num_workers: config.concurrency,
            stats,
            shutdown_token: CancellationToken::new(),
            ticker_token,
        })
    }

    pub(crate) fn status(&self) -> PoolStatus {
        self.stats.status()
    }

    /// Records a chunk that never made it into the queue.
    pub(crate) fn record_failure(&self, failure: UploadFailure) {
        self.stats.record_failure(failure);
    }

    /// Queues `chunk` for upload, waiting for queue capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pool is shutting down (`shutdown_token` was cancelled).
    /// - Every worker has exited and the queue is closed.
    pub(crate) async fn submit(&self, chunk: Chunk) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::PoolShutdown);
        }

        let order = chunk.order();
        match self.queue.send(WorkRequest::Upload { chunk }).await {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(())
            }
            Err(_) => Err(Error::ChannelError {
                context: format!("Upload queue closed before chunk {order}"),
            }),
        }
    }

    /// Drains the pool and reports what happened to every submitted chunk.
    ///
    /// - Cancels the shutdown token so no new chunk is accepted.
    /// - Queues one [`WorkRequest::Shutdown`] per worker behind pending
    ///   uploads.
    /// - Waits for every worker to acknowledge, which happens only after the
    ///   upload it was running has finished.
    ///
    /// Callers bound the wait, if at all, from the outside.
    pub(crate) async fn shutdown(&self) -> Result<DrainReport> {
        // === Phase 0: Stop accepting new chunks ===
        #[cfg(feature = "tracing")]
        tracing::debug!("Refusing new chunks");
        self.shutdown_token.cancel();

        // === Phase 1: Queue shutdown requests behind pending uploads ===
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Draining upload queue ({} uploads in flight)",
            self.stats.in_flight()
        );
        let mut acknowledgements = Vec::with_capacity(self.num_workers);

        for _i in 0..self.num_workers {
            let (tx, rx) = oneshot::channel();
            if let Err(_e) = self.queue.send(WorkRequest::Shutdown { response: tx }).await {
                // Every worker is gone already.
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to queue shutdown request {_i}: {_e}");
                break;
            }
            acknowledgements.push(rx);
        }

        // === Phase 2: Wait for every worker to acknowledge ===
        let acknowledgements = acknowledgements
            .into_iter()
            .enumerate()
            .map(|(_i, rx)| async move {
                match rx.await {
                    Ok(()) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!("Shutdown request {_i} acknowledged");
                    }
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Shutdown request {_i} dropped: {_e}");
                    }
                }
            });
        futures::future::join_all(acknowledgements).await;

        self.ticker_token.cancel();

        let report = self.stats.report();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Worker pool drained: {} submitted, {} uploaded, {} failed",
            report.submitted,
            report.uploaded,
            report.failures.len()
        );

        Ok(report)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers exit on their own once the queue closes.
        self.ticker_token.cancel();
    }
}

/// Logs the pool's counters every `period` until `token` is cancelled.
#[cfg(feature = "tracing")]
async fn liveness_ticker(
    period: core::time::Duration,
    stats: Arc<PoolStats>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {
                tracing::trace!(
                    submitted = stats.submitted(),
                    uploaded = stats.uploaded(),
                    in_flight = stats.in_flight(),
                    failed = stats.failed(),
                    "Worker pool alive"
                );
            }
        }
    }
}

use super::{request::WorkRequest, stats::PoolStats};
use crate::{Chunk, Client, RetryPolicy, UploadError, UploadFailure};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::{Mutex, mpsc};

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// All workers share one receiver. The lock is held only while waiting for the
/// next request, so idle workers line up behind it and exactly one of them
/// takes each request.
///
/// The worker exits when it receives [`WorkRequest::Shutdown`] or when the
/// queue is closed because the pool was dropped.
#[allow(clippy::used_underscore_binding)]
pub(crate) async fn worker_loop(
    _worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<WorkRequest>>>,
    client: Arc<dyn Client>,
    retry: RetryPolicy,
    stats: Arc<PoolStats>,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} started");

    loop {
        let work = queue.lock().await.recv().await;

        match work {
            Some(WorkRequest::Upload { chunk }) => {
                handle_upload(_worker_id, &chunk, client.as_ref(), &retry, &stats).await;
            }
            Some(WorkRequest::Shutdown { response }) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {_worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {_worker_id} failed to acknowledge shutdown");
                }
                break;
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {_worker_id} queue closed");
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} stopped");
}

/// Uploads one chunk, retrying according to `retry`.
///
/// A panicking client counts as a failed attempt so the worker survives and
/// the pool keeps its full concurrency.
#[allow(clippy::used_underscore_binding)]
async fn handle_upload(
    _worker_id: usize,
    chunk: &Chunk,
    client: &dyn Client,
    retry: &RetryPolicy,
    stats: &PoolStats,
) {
    stats.begin_upload();
    let mut attempt = 0;

    let outcome = loop {
        attempt += 1;

        let result = AssertUnwindSafe(client.upload(chunk))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(UploadError::new("client panicked during upload")));

        match result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    "Worker {_worker_id} uploaded chunk {} ({} bytes)",
                    chunk.order(),
                    chunk.len()
                );
                break Ok(());
            }
            Err(_error) if attempt < retry.max_attempts => {
                let delay = retry.backoff_for(attempt);

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Worker {_worker_id} retrying chunk {} in {delay:?} (attempt {attempt}): {_error}",
                    chunk.order()
                );

                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Worker {_worker_id} gave up on chunk {} after {attempt} attempts: {error}",
                    chunk.order()
                );

                break Err(UploadFailure {
                    order: chunk.order(),
                    attempts: attempt,
                    error,
                });
            }
        }
    };

    stats.finish_upload(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use core::time::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::oneshot;

    /// Fails the first `failures` attempts, then succeeds.
    struct Flaky {
        failures: u32,
        attempts: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[crate::async_trait]
    impl Client for Flaky {
        async fn upload(&self, _chunk: &Chunk) -> Result<(), UploadError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                Err(UploadError::new(format!("attempt {attempt} refused")))
            } else {
                Ok(())
            }
        }
    }

    struct Panicking;

    #[crate::async_trait]
    impl Client for Panicking {
        async fn upload(&self, _chunk: &Chunk) -> Result<(), UploadError> {
            panic!("transport exploded");
        }
    }

    fn chunk() -> Chunk {
        Chunk::new(4, Bytes::from_static(b"output"))
    }

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::exponential(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn retries_until_success() {
        let client = Flaky::new(2);
        let stats = PoolStats::default();
        handle_upload(0, &chunk(), &client, &quick_retry(3), &stats).await;

        assert_eq!(client.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(stats.uploaded(), 1);
        assert!(stats.report().failures.is_empty());
    }

    #[tokio::test]
    async fn reports_failure_after_last_attempt() {
        let client = Flaky::new(5);
        let stats = PoolStats::default();
        handle_upload(0, &chunk(), &client, &quick_retry(2), &stats).await;

        let report = stats.report();
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].order, 4);
        assert_eq!(report.failures[0].attempts, 2);
        assert_eq!(report.failures[0].error.reason(), "attempt 2 refused");
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn no_retry_policy_makes_one_attempt() {
        let client = Flaky::new(1);
        let stats = PoolStats::default();
        handle_upload(0, &chunk(), &client, &RetryPolicy::none(), &stats).await;

        assert_eq!(client.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(stats.failed(), 1);
    }

    #[tokio::test]
    async fn panicking_client_is_a_failed_attempt() {
        let stats = PoolStats::default();
        handle_upload(0, &chunk(), &Panicking, &RetryPolicy::none(), &stats).await;

        let report = stats.report();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].attempts, 1);
    }

    #[tokio::test]
    async fn acknowledges_shutdown_after_queued_uploads() {
        let (tx, rx) = mpsc::channel(4);
        let stats = Arc::new(PoolStats::default());
        let worker = tokio::spawn(worker_loop(
            0,
            Arc::new(Mutex::new(rx)),
            Arc::new(Flaky::new(0)),
            RetryPolicy::none(),
            Arc::clone(&stats),
        ));

        tx.send(WorkRequest::Upload { chunk: chunk() }).await.unwrap();
        tx.send(WorkRequest::Upload { chunk: chunk() }).await.unwrap();
        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(WorkRequest::Shutdown { response: ack_tx }).await.unwrap();

        ack_rx.await.unwrap();
        assert_eq!(stats.uploaded(), 2);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn exits_when_queue_closes() {
        let (tx, rx) = mpsc::channel::<WorkRequest>(1);
        let worker = tokio::spawn(worker_loop(
            0,
            Arc::new(Mutex::new(rx)),
            Arc::new(Flaky::new(0)),
            RetryPolicy::none(),
            Arc::new(PoolStats::default()),
        ));

        drop(tx);
        worker.await.unwrap();
    }
}

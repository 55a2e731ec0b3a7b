use crate::{DrainReport, PoolStatus, UploadFailure};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Counters shared by the pool, its workers and the submission tasks.
///
/// Counters use relaxed ordering: they are read for reporting only, after the
/// drain has joined every worker, or for liveness logs where staleness is
/// harmless.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    submitted: AtomicU64,
    uploaded: AtomicU64,
    in_flight: AtomicUsize,
    failures: Mutex<Vec<UploadFailure>>,
    failure_tx: Option<mpsc::UnboundedSender<UploadFailure>>,
}

impl PoolStats {
    pub(crate) fn new(failure_tx: Option<mpsc::UnboundedSender<UploadFailure>>) -> Self {
        Self {
            failure_tx,
            ..Self::default()
        }
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn begin_upload(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn finish_upload(&self, outcome: Result<(), UploadFailure>) {
        match outcome {
            Ok(()) => {
                self.uploaded.fetch_add(1, Ordering::Relaxed);
            }
            Err(failure) => self.record_failure(failure),
        }
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Stores `failure` and forwards it to the subscriber, if any.
    pub(crate) fn record_failure(&self, failure: UploadFailure) {
        if let Some(tx) = &self.failure_tx {
            // The subscriber may have gone away; the failure is still kept.
            let _ = tx.send(failure.clone());
        }
        self.failures.lock().push(failure);
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub(crate) fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Relaxed)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> usize {
        self.failures.lock().len()
    }

    pub(crate) fn status(&self) -> PoolStatus {
        PoolStatus {
            submitted: self.submitted(),
            uploaded: self.uploaded(),
            in_flight: self.in_flight(),
            failed: self.failed(),
        }
    }

    pub(crate) fn report(&self) -> DrainReport {
        let mut failures = self.failures.lock().clone();
        failures.sort_by_key(|failure| failure.order);

        DrainReport {
            submitted: self.submitted(),
            uploaded: self.uploaded(),
            failures,
        }
    }
}

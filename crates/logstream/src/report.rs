use crate::UploadError;

/// A chunk that could not be delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFailure {
    /// Order of the chunk that failed.
    pub order: u64,
    /// Upload attempts made before giving up. Zero means the chunk never
    /// reached a worker.
    pub attempts: u32,
    /// Error from the last attempt.
    pub error: UploadError,
}

/// Summary of a completed drain, returned by
/// [`Streamer::stop`](crate::Streamer::stop).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Chunks accepted into the pool's queue.
    pub submitted: u64,
    /// Chunks the client uploaded successfully.
    pub uploaded: u64,
    /// Chunks that failed permanently, sorted by order.
    pub failures: Vec<UploadFailure>,
}

impl DrainReport {
    /// `true` when every submitted chunk was uploaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.uploaded == self.submitted
    }
}

/// Point-in-time view of the worker pool's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStatus {
    pub submitted: u64,
    pub uploaded: u64,
    pub in_flight: usize,
    pub failed: usize,
}

//! Bounded worker pool that uploads chunks.
//!
//! A fixed number of Tokio tasks pull [`WorkRequest`]s from one bounded MPSC
//! queue and hand each chunk to the [`Client`](crate::Client). Submitting
//! waits for queue capacity, which is the pool's only backpressure.
//!
//! ## Submodules
//!
//! - [`manager`] - Owns the queue, submission, liveness logging and the drain.
//! - [`worker`] - The worker loop and per-chunk upload with retries.
//! - [`request`] - Messages sent to workers.
//! - [`stats`] - Counters and failures shared between workers.

pub(crate) mod manager;
pub(crate) mod request;
pub(crate) mod stats;
pub(crate) mod worker;

pub(crate) use manager::WorkerPool;

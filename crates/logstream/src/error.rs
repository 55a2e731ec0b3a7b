//! Error types for the log streamer.
//!
//! ## Error Cases
//! - `InvalidConfig`: The configuration cannot build a worker pool.
//! - `RuntimeUnavailable`: `start` was called outside a Tokio runtime.
//! - `InvalidState`: A lifecycle operation was called in the wrong state.
//! - `ChannelError`: Internal communication with the workers failed.
//! - `PoolShutdown`: A chunk was submitted after the pool began shutting down.
//! - `DrainTimeout`: `stop` gave up waiting for in-flight uploads.
//!
//! Upload failures are not errors of the streamer itself. They are reported
//! per chunk through [`UploadFailure`](crate::UploadFailure).

use crate::StreamerState;
use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the log streamer.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// No Tokio runtime is available to host the worker pool.
    #[error("Tokio runtime unavailable: {context}")]
    RuntimeUnavailable { context: String },

    /// The operation is not allowed in the streamer's current state.
    #[error("Streamer is {actual}, expected {expected}")]
    InvalidState {
        actual: StreamerState,
        expected: StreamerState,
    },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The pool is shutting down and refuses new chunks.
    #[error("Worker pool is shutting down")]
    PoolShutdown,

    /// The drain did not finish within the configured timeout.
    #[error("Drain timed out after {timeout:?}")]
    DrainTimeout { timeout: Duration },
}

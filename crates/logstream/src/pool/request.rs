use crate::Chunk;
use tokio::sync::oneshot;

/// A message sent from the pool to a worker.
///
/// - [`Upload`] hands one chunk to the client.
/// - [`Shutdown`] stops the worker once everything queued ahead of it is
///   handled.
///
/// [`Upload`]: WorkRequest::Upload
/// [`Shutdown`]: WorkRequest::Shutdown
#[derive(Debug)]
pub(crate) enum WorkRequest {
    /// Upload `chunk`, retrying according to the pool's policy.
    Upload { chunk: Chunk },

    /// Finish and acknowledge through `response`.
    Shutdown { response: oneshot::Sender<()> },
}

use crate::Chunk;
use std::sync::Arc;

pub use async_trait::async_trait;

/// Failure reported by a [`Client`] for a single upload attempt.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[error("Upload failed: {reason}")]
pub struct UploadError {
    reason: String,
}

impl UploadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Transport that carries a [`Chunk`] to the remote log-ingestion endpoint.
///
/// Workers call [`Client::upload`] once per attempt. Implementations own any
/// timeout; the pool never cancels an upload in progress. Calls for different
/// chunks run concurrently and may complete in any order.
#[async_trait]
pub trait Client: Send + Sync + 'static {
    async fn upload(&self, chunk: &Chunk) -> Result<(), UploadError>;
}

#[async_trait]
impl<C: Client + ?Sized> Client for Arc<C> {
    async fn upload(&self, chunk: &Chunk) -> Result<(), UploadError> {
        (**self).upload(chunk).await
    }
}

#[async_trait]
impl<C: Client + ?Sized> Client for Box<C> {
    async fn upload(&self, chunk: &Chunk) -> Result<(), UploadError> {
        (**self).upload(chunk).await
    }
}

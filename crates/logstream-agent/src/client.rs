use logstream::{Chunk, Client, UploadError, async_trait};
use std::path::{Path, PathBuf};

/// Stores every chunk as its own file, `chunk-<order>.log`, under a
/// directory.
///
/// Orders are zero-padded so a lexicographic listing is also the stream
/// order, and `cat chunk-*.log` reassembles the output.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    root: PathBuf,
}

impl DirectoryClient {
    /// Creates `root` (and its parents) if needed.
    pub async fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chunk_path(&self, order: u64) -> PathBuf {
        self.root.join(format!("chunk-{order:010}.log"))
    }
}

#[async_trait]
impl Client for DirectoryClient {
    async fn upload(&self, chunk: &Chunk) -> Result<(), UploadError> {
        let path = self.chunk_path(chunk.order());
        tokio::fs::write(&path, chunk.blob())
            .await
            .map_err(|e| UploadError::new(format!("writing {}: {e}", path.display())))
    }
}

/// Logs chunk metadata and discards the contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogClient;

#[async_trait]
impl Client for LogClient {
    async fn upload(&self, chunk: &Chunk) -> Result<(), UploadError> {
        tracing::info!(order = chunk.order(), bytes = chunk.len(), "Chunk ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(text: &str) -> Chunk {
        Chunk::new(3, text.as_bytes().to_vec().into())
    }

    #[tokio::test]
    async fn writes_one_file_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let client = DirectoryClient::create(dir.path().join("job-1")).await.unwrap();

        client.upload(&blob("compiling...\n")).await.unwrap();

        let path = client.chunk_path(3);
        assert!(path.ends_with("chunk-0000000003.log"));
        assert_eq!(std::fs::read(path).unwrap(), b"compiling...\n");
    }

    #[tokio::test]
    async fn reports_io_errors_as_upload_failures() {
        let dir = tempfile::tempdir().unwrap();
        let client = DirectoryClient::create(dir.path()).await.unwrap();
        // A directory where the chunk file should go makes the write fail.
        std::fs::create_dir(client.chunk_path(3)).unwrap();

        let err = client.upload(&blob("x")).await.unwrap_err();
        assert!(err.reason().contains("chunk-0000000003.log"));
    }

    #[tokio::test]
    async fn log_client_accepts_everything() {
        assert!(LogClient.upload(&blob("anything")).await.is_ok());
    }
}

//! Orchestration of diffing, chunking and dispatch.
//!
//! A [`Streamer`] owns all ordering state: how many bytes of output it has
//! seen, the order the next chunk receives, and the history of every chunk it
//! produced. Only [`Streamer::process`] mutates that state and it takes
//! `&mut self`, so there is a single writer by construction.

mod submit;

use crate::{
    Chunk, Chunker, Client, DrainReport, Error, PoolStatus, Result, StreamerConfig,
    UploadFailure, new_output, pool::WorkerPool,
};
use bytes::Bytes;
use core::fmt;
use std::sync::Arc;
use submit::SubmissionQueue;
use tokio::{runtime::Handle, sync::mpsc};

/// Lifecycle states of a [`Streamer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamerState {
    /// Constructed; no worker pool yet.
    Created,
    /// Worker pool running; output may be processed.
    Started,
    /// Drained. Terminal.
    Stopped,
}

impl fmt::Display for StreamerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

enum State {
    Created,
    Started(SubmissionQueue),
    Stopped,
}

impl State {
    const fn kind(&self) -> StreamerState {
        match self {
            Self::Created => StreamerState::Created,
            Self::Started(_) => StreamerState::Started,
            Self::Stopped => StreamerState::Stopped,
        }
    }
}

/// Turns cumulative process output into ordered chunks and uploads them.
///
/// Lifecycle: [`new`](Self::new) → [`start`](Self::start) →
/// [`process`](Self::process)* → [`stop`](Self::stop).
///
/// Every call to `process` receives the *full* output captured so far. Only
/// the bytes beyond what earlier calls saw are chunked and uploaded.
pub struct Streamer {
    config: StreamerConfig,
    client: Arc<dyn Client>,
    chunker: Chunker,
    state: State,
    processed_bytes: usize,
    next_order: u64,
    history: Vec<Chunk>,
    failure_tx: Option<mpsc::UnboundedSender<UploadFailure>>,
}

impl Streamer {
    /// Creates a streamer with the default configuration: 5 workers and
    /// 100,000-byte chunks.
    pub fn new<C: Client>(client: C) -> Self {
        Self::build(Arc::new(client), StreamerConfig::default())
    }

    /// Creates a streamer with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn with_config<C: Client>(client: C, config: StreamerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Arc::new(client), config))
    }

    fn build(client: Arc<dyn Client>, config: StreamerConfig) -> Self {
        Self {
            chunker: Chunker::new(config.max_chunk_size),
            config,
            client,
            state: State::Created,
            processed_bytes: 0,
            next_order: 1,
            history: Vec::new(),
            failure_tx: None,
        }
    }

    /// Returns a channel that receives every permanent upload failure as it
    /// happens. The same failures also appear in the [`DrainReport`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the streamer is `Created`.
    pub fn subscribe_failures(&mut self) -> Result<mpsc::UnboundedReceiver<UploadFailure>> {
        self.expect_state(StreamerState::Created)?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.failure_tx = Some(tx);
        Ok(rx)
    }

    /// Starts the worker pool on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the streamer is `Created`.
    /// - [`Error::RuntimeUnavailable`] when called outside a Tokio runtime.
    ///
    /// On error the streamer stays `Created` and cannot process output.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(StreamerState::Created)?;

        let runtime = Handle::try_current().map_err(|e| Error::RuntimeUnavailable {
            context: e.to_string(),
        })?;
        let pool = WorkerPool::spawn(
            &self.config,
            Arc::clone(&self.client),
            self.failure_tx.take(),
            &runtime,
        )?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Log streamer started with {} workers",
            self.config.concurrency
        );

        self.state = State::Started(SubmissionQueue::new(pool, runtime));
        Ok(())
    }

    /// Chunks the new part of `output` and queues every chunk for upload.
    ///
    /// `output` must be cumulative: each call's output extends the previous
    /// one. Returns the chunks produced by this call, which are also appended
    /// to [`history`](Self::history). Never waits for the pool; each chunk is
    /// handed to its own submission task.
    ///
    /// Output shorter than what was already processed produces no chunks and
    /// leaves all state untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the streamer is `Started`.
    pub fn process(&mut self, output: impl AsRef<[u8]>) -> Result<&[Chunk]> {
        let output = output.as_ref();
        let queue = match &mut self.state {
            State::Started(queue) => queue,
            other => {
                return Err(Error::InvalidState {
                    actual: other.kind(),
                    expected: StreamerState::Started,
                });
            }
        };

        let Some(suffix) = new_output(output, self.processed_bytes) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Output shrank from {} to {} bytes; ignoring",
                self.processed_bytes,
                output.len()
            );
            return Ok(&[]);
        };

        if suffix.is_empty() {
            return Ok(&[]);
        }

        let chunks = self
            .chunker
            .split(Bytes::copy_from_slice(suffix), &mut self.next_order);
        for chunk in &chunks {
            queue.submit(chunk.clone());
        }

        self.processed_bytes = output.len();
        let first_new = self.history.len();
        self.history.extend(chunks);
        Ok(&self.history[first_new..])
    }

    /// Waits for every chunk to be handed to the client, then shuts the pool
    /// down.
    ///
    /// Every submission task spawned by [`process`](Self::process) is awaited
    /// first, then every queued upload. The streamer is `Stopped` afterwards
    /// even if the drain times out.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the streamer is `Started`.
    /// - [`Error::DrainTimeout`] if `drain_timeout` elapses first.
    pub async fn stop(&mut self) -> Result<DrainReport> {
        let queue = match core::mem::replace(&mut self.state, State::Stopped) {
            State::Started(queue) => queue,
            other => {
                let actual = other.kind();
                self.state = other;
                return Err(Error::InvalidState {
                    actual,
                    expected: StreamerState::Started,
                });
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Waiting for the log streaming workers to finish");

        let report = match self.config.drain_timeout {
            Some(timeout) => tokio::time::timeout(timeout, queue.drain())
                .await
                .map_err(|_| Error::DrainTimeout { timeout })??,
            None => queue.drain().await?,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Log streamer stopped after {} chunks ({} bytes)",
            self.history.len(),
            self.processed_bytes
        );

        Ok(report)
    }

    pub const fn state(&self) -> StreamerState {
        self.state.kind()
    }

    pub const fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Bytes of output chunked so far. Always equals the sum of the lengths of
    /// all chunks in [`history`](Self::history).
    pub const fn processed_bytes(&self) -> usize {
        self.processed_bytes
    }

    /// Order the next chunk will receive.
    pub const fn next_order(&self) -> u64 {
        self.next_order
    }

    /// Every chunk produced so far, in order.
    pub fn history(&self) -> &[Chunk] {
        &self.history
    }

    /// Submission tasks that have not yet placed their chunk in the pool's
    /// queue. Grows without bound when output is produced faster than it can
    /// be uploaded.
    pub fn pending_submissions(&self) -> usize {
        match &self.state {
            State::Started(queue) => queue.pending(),
            State::Created | State::Stopped => 0,
        }
    }

    /// Current pool counters, or `None` unless the streamer is `Started`.
    pub fn pool_status(&self) -> Option<PoolStatus> {
        match &self.state {
            State::Started(queue) => Some(queue.status()),
            State::Created | State::Stopped => None,
        }
    }

    fn expect_state(&self, expected: StreamerState) -> Result<()> {
        let actual = self.state.kind();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::InvalidState { actual, expected })
        }
    }
}

impl fmt::Debug for Streamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streamer")
            .field("state", &self.state.kind())
            .field("processed_bytes", &self.processed_bytes)
            .field("next_order", &self.next_order)
            .field("chunks", &self.history.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

use crate::{Chunk, MAX_CHUNK_SIZE};
use bytes::Bytes;

/// Splits new output into consecutive, size-bounded [`Chunk`]s.
///
/// Every chunk except possibly the last is exactly `max_chunk_size` bytes.
/// Chunks cover the input exactly, in input order, with no gaps or overlaps.
/// Slicing is zero-copy: every chunk shares the input's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunker {
    max_chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(MAX_CHUNK_SIZE)
    }
}

impl Chunker {
    /// Creates a chunker producing chunks of at most `max_chunk_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `max_chunk_size` is zero.
    /// [`StreamerConfig::validate`](crate::StreamerConfig::validate) rejects
    /// that value before a streamer ever builds a chunker.
    pub const fn new(max_chunk_size: usize) -> Self {
        assert!(max_chunk_size > 0, "max_chunk_size must be greater than 0");
        Self { max_chunk_size }
    }

    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Partitions `suffix` into chunks, drawing one order per chunk from
    /// `next_order`.
    ///
    /// `next_order` holds the order the next chunk will receive and is
    /// advanced past every chunk produced. An empty `suffix` produces no
    /// chunks and leaves the counter untouched.
    pub fn split(&self, suffix: Bytes, next_order: &mut u64) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(suffix.len().div_ceil(self.max_chunk_size));
        let mut start = 0;

        while start < suffix.len() {
            let end = suffix.len().min(start + self.max_chunk_size);
            let order = *next_order;
            *next_order += 1;

            #[cfg(feature = "tracing")]
            tracing::debug!("Creating {} byte chunk (order {order})", end - start);

            chunks.push(Chunk::new(order, suffix.slice(start..end)));
            start = end;
        }

        chunks
    }
}

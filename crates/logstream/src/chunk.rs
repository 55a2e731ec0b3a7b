use bytes::Bytes;
use core::fmt;

/// A bounded, ordered slice of captured output.
///
/// Chunks are immutable once created. The `order` is assigned exactly once by
/// the [`Chunker`](crate::Chunker) and is strictly increasing across the whole
/// lifetime of a [`Streamer`](crate::Streamer), starting at 1. Uploads may
/// finish in any order, so consumers must sequence chunks by [`Chunk::order`]
/// rather than by arrival.
///
/// Cloning is cheap: the blob is a reference-counted [`Bytes`] view.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    order: u64,
    blob: Bytes,
}

impl Chunk {
    /// Creates a chunk with the given `order` and `blob`.
    pub const fn new(order: u64, blob: Bytes) -> Self {
        Self { order, blob }
    }

    /// Position of this chunk in the overall stream (1-based).
    pub const fn order(&self) -> u64 {
        self.order
    }

    /// The raw output bytes carried by this chunk.
    pub const fn blob(&self) -> &Bytes {
        &self.blob
    }

    /// Length of the blob in bytes.
    pub fn len(&self) -> usize {
        self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }
}

// Blobs can be up to 100kB of log output; keep `{:?}` readable.
impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("order", &self.order)
            .field("length", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_tracks_blob() {
        let chunk = Chunk::new(1, Bytes::from_static(b"hello"));
        assert_eq!(chunk.order(), 1);
        assert_eq!(chunk.len(), 5);
        assert_eq!(chunk.blob().as_ref(), b"hello");
        assert!(!chunk.is_empty());
    }

    #[test]
    fn debug_omits_blob_contents() {
        let chunk = Chunk::new(7, Bytes::from_static(b"secret token"));
        let debug = format!("{chunk:?}");
        assert!(debug.contains("order: 7"));
        assert!(debug.contains("length: 12"));
        assert!(!debug.contains("secret"));
    }
}

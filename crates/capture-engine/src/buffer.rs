//! Chunk buffering for one recording.

use clipcast_platform_core::MediaChunk;

/// Ordered, append-only accumulation of encoded fragments.
///
/// Zero-length fragments are counted but never stored.
#[derive(Debug)]
pub struct ChunkBuffer<C> {
    chunks: Vec<C>,
    total_bytes: u64,
    skipped_empty: u64,
}

impl<C: MediaChunk> ChunkBuffer<C> {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            total_bytes: 0,
            skipped_empty: 0,
        }
    }

    /// Append a fragment. Returns `false` if it was empty and discarded.
    pub fn push(&mut self, chunk: C) -> bool {
        let len = chunk.byte_len();
        if len == 0 {
            self.skipped_empty += 1;
            return false;
        }
        self.total_bytes += len;
        self.chunks.push(chunk);
        true
    }

    /// Number of stored fragments.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of stored fragment lengths.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Number of zero-length deliveries that were discarded.
    pub fn skipped_empty(&self) -> u64 {
        self.skipped_empty
    }

    /// Consume the buffer, yielding fragments in arrival order.
    pub fn into_chunks(self) -> Vec<C> {
        self.chunks
    }
}

impl<C: MediaChunk> Default for ChunkBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MediaChunk + AsRef<[u8]>> ChunkBuffer<C> {
    /// Concatenate byte fragments in arrival order.
    pub fn concat(&self) -> Vec<u8> {
        concat_chunks(&self.chunks)
    }
}

/// Concatenate byte fragments in order.
pub fn concat_chunks<C: AsRef<[u8]>>(chunks: &[C]) -> Vec<u8> {
    let total = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in chunks {
        out.extend_from_slice(chunk.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_fragments_are_discarded() {
        let mut buffer = ChunkBuffer::new();
        assert!(buffer.push(vec![1u8; 5]));
        assert!(!buffer.push(Vec::new()));
        assert!(buffer.push(vec![2u8; 3]));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_bytes(), 8);
        assert_eq!(buffer.skipped_empty(), 1);
        assert_eq!(buffer.concat().len(), 8);
    }

    #[test]
    fn into_chunks_preserves_order() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(b"ab".to_vec());
        buffer.push(b"cd".to_vec());
        let chunks = buffer.into_chunks();
        assert_eq!(chunks, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }

    proptest! {
        #[test]
        fn concat_is_ordered_sum_of_non_empty(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32)) {
            let mut buffer = ChunkBuffer::new();
            for chunk in &chunks {
                buffer.push(chunk.clone());
            }

            let expected: Vec<u8> = chunks.iter().flatten().copied().collect();
            let non_empty = chunks.iter().filter(|c| !c.is_empty()).count();

            prop_assert_eq!(buffer.total_bytes(), expected.len() as u64);
            prop_assert_eq!(buffer.len(), non_empty);
            prop_assert_eq!(buffer.concat(), expected);
        }
    }
}

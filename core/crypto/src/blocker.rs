//! Fixed-size chunking of byte buffers.

/// A cursor that hands out consecutive `block_size` chunks of a buffer.
///
/// The last chunk may be shorter than `block_size`. Once the buffer is
/// exhausted every call to [`Blocker::next_block`] returns `(0, &[])`.
#[derive(Debug, Clone)]
pub struct Blocker<'a> {
    block_size: usize,
    position: usize,
    buffer: &'a [u8],
}

impl<'a> Blocker<'a> {
    /// Create a cursor over `buffer` starting at the first block.
    pub fn new(block_size: usize, buffer: &'a [u8]) -> Self {
        Self {
            block_size,
            position: 0,
            buffer,
        }
    }

    /// Return the next chunk and its length.
    ///
    /// A zero count signals exhaustion; it is returned on every call after
    /// the final chunk.
    pub fn next_block(&mut self) -> (usize, &'a [u8]) {
        if self.block_size == 0 {
            return (0, &[]);
        }
        let first = self.position.saturating_mul(self.block_size);
        if first >= self.buffer.len() {
            return (0, &[]);
        }
        let last = (first + self.block_size).min(self.buffer.len());
        self.position += 1;
        (last - first, &self.buffer[first..last])
    }

    /// Number of chunks handed out so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl<'a> Iterator for Blocker<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_block() {
            (0, _) => None,
            (_, block) => Some(block),
        }
    }
}

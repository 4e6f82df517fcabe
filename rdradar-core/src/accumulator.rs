//! Append-only byte buffer for the incoming serial stream.
//!
//! Bytes enter at the tail ([`ByteAccumulator::append`]) and leave from the
//! head ([`ByteAccumulator::consume`]); they are never reordered. Offsets are
//! relative to the current head, so every offset obtained before a `consume`
//! is invalid afterwards.
//!
//! Evicted bytes are not moved on every `consume`. The buffer keeps a head
//! index and compacts once the dead prefix outweighs the live bytes, which
//! keeps the total copying cost linear in the stream length.

use crate::error::AccumulatorError;

/// Default growth cap (64 KiB)
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 64 * 1024;

/// Growable byte buffer with prefix eviction and bounded search.
#[derive(Debug, Clone, Default)]
pub struct ByteAccumulator {
    /// Backing storage; `buf[head..]` are the live bytes
    buf: Vec<u8>,
    /// Number of evicted bytes still physically present at the front
    head: usize,
}

impl ByteAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty accumulator with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        ByteAccumulator {
            buf: Vec::with_capacity(capacity),
            head: 0,
        }
    }

    /// Number of live bytes.
    pub fn len(&self) -> usize {
        self.buf.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live bytes, oldest first.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.head..]
    }

    /// Extend the buffer with a chunk from the transport.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Lowest offset `>= from` at which `marker` starts, or `None`.
    ///
    /// An empty marker matches at `from` as long as `from` is within the buffer.
    pub fn find(&self, marker: &[u8], from: usize) -> Option<usize> {
        self.find_within(marker, from, self.len())
    }

    /// Like [`find`](Self::find), but the match must end at or before `end`.
    pub fn find_within(&self, marker: &[u8], from: usize, end: usize) -> Option<usize> {
        let end = end.min(self.len());
        if from > end {
            return None;
        }
        if marker.is_empty() {
            return Some(from);
        }
        let window = &self.as_slice()[from..end];
        if window.len() < marker.len() {
            return None;
        }
        let first = marker[0];
        window
            .windows(marker.len())
            .enumerate()
            .filter(|(_, w)| w[0] == first)
            .find(|(_, w)| *w == marker)
            .map(|(i, _)| from + i)
    }

    /// Discard the first `n` bytes.
    pub fn consume(&mut self, n: usize) -> Result<(), AccumulatorError> {
        let len = self.len();
        if n > len {
            return Err(AccumulatorError::OutOfRange {
                start: 0,
                end: n,
                len,
            });
        }
        self.head += n;
        if self.head == self.buf.len() {
            self.buf.clear();
            self.head = 0;
        } else if self.head >= self.len() {
            self.buf.drain(..self.head);
            self.head = 0;
        }
        Ok(())
    }

    /// Read-only view of `start..end`, valid until the next `consume`.
    pub fn slice(&self, start: usize, end: usize) -> Result<&[u8], AccumulatorError> {
        let len = self.len();
        if start > end || end > len {
            return Err(AccumulatorError::OutOfRange { start, end, len });
        }
        Ok(&self.as_slice()[start..end])
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }
}

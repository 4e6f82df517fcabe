//! Frame boundary search over the accumulator.
//!
//! The locator keeps cursors between calls so a growing buffer is never
//! rescanned from the start: the header search resumes where the previous one
//! stopped (minus the bytes that could still be a split header), and the
//! trailer search resumes after the last rejected trailer position.
//!
//! Formats with a length field expect the trailer exactly where the length
//! field points; the trailer scan only runs when it is not there. A trailer
//! that a later header could own ends the current header as invalid, so a
//! spurious header never swallows the frame behind it.
//!
//! ```text
//!   cursor                 header               trailer_cursor
//!     │                      │                        │
//! ────▼──────────────────────▼────────────────────────▼──────────────
//!     noise already scanned  │ header │ record bytes  │ not yet seen
//! ```
//!
//! All offsets are accumulator offsets and must be shifted with
//! [`FrameLocator::consumed`] whenever the accumulator evicts a prefix.

use std::ops::Range;

use crate::accumulator::ByteAccumulator;
use crate::decoder::read_uint;
use crate::format::{FrameFormat, Framing};

/// Classification of a frame candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    /// Span delimits one frame, ready for decode
    Complete,
    /// Awaiting more bytes
    Incomplete,
    /// Header with no acceptable trailer within the maximum frame length
    Invalid,
}

/// A byte span believed to delimit one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCandidate {
    /// Accumulator offsets; starts at the header when one has been found
    pub span: Range<usize>,
    pub status: CandidateStatus,
}

impl FrameCandidate {
    fn new(span: Range<usize>, status: CandidateStatus) -> Self {
        FrameCandidate { span, status }
    }
}

/// Incremental header/trailer scanner.
#[derive(Debug, Clone, Default)]
pub struct FrameLocator {
    /// Header search resumes here
    cursor: usize,
    /// Start of the header currently being accumulated
    header: Option<usize>,
    /// Trailer search resumes here
    trailer_cursor: usize,
}

impl FrameLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the located header, if any.
    pub fn header(&self) -> Option<usize> {
        self.header
    }

    /// Produce the next candidate from the buffered bytes.
    ///
    /// With no header in the buffer the result is `Incomplete` with an empty
    /// span at the retained scan cursor.
    pub fn locate(&mut self, acc: &ByteAccumulator, format: &FrameFormat) -> FrameCandidate {
        let marker = format.header();
        let len = acc.len();

        let h = match self.header {
            Some(h) => h,
            None => match acc.find(marker, self.cursor) {
                Some(h) => {
                    self.header = Some(h);
                    self.trailer_cursor = h + marker.len();
                    h
                }
                None => {
                    // Keep the tail that could be the start of a split header
                    self.cursor = self.cursor.max((len + 1).saturating_sub(marker.len()));
                    return FrameCandidate::new(
                        self.cursor..self.cursor,
                        CandidateStatus::Incomplete,
                    );
                }
            },
        };

        match format.framing() {
            Framing::FixedLength(frame_len) => {
                if len >= h + frame_len {
                    FrameCandidate::new(h..h + frame_len, CandidateStatus::Complete)
                } else {
                    FrameCandidate::new(h..len, CandidateStatus::Incomplete)
                }
            }
            Framing::Trailer(trailer) => self.locate_trailer(acc, format, h, trailer),
        }
    }

    fn locate_trailer(
        &mut self,
        acc: &ByteAccumulator,
        format: &FrameFormat,
        h: usize,
        trailer: &[u8],
    ) -> FrameCandidate {
        let len = acc.len();
        let window_end = h + format.max_frame_len();

        if let Some(lf) = format.length_field() {
            if len < h + lf.offset + lf.width {
                return FrameCandidate::new(h..len, CandidateStatus::Incomplete);
            }
            // Trust the declared length when the trailer sits exactly there
            if let Some(end) = declared_end(acc, format, h).filter(|end| *end <= window_end) {
                if len < end {
                    return FrameCandidate::new(h..len, CandidateStatus::Incomplete);
                }
                if acc.slice(end - trailer.len(), end).ok() == Some(trailer) {
                    return FrameCandidate::new(h..end, CandidateStatus::Complete);
                }
            }
        }

        let mut from = self.trailer_cursor;
        while let Some(t) = acc.find_within(trailer, from, window_end) {
            let end = t + trailer.len();
            if let Some(next) = inner_header(acc, format, h, t, end) {
                // The trailer belongs to a later header; this one never completed
                return FrameCandidate::new(h..next, CandidateStatus::Invalid);
            }
            if format.is_plausible_len(end - h) {
                return FrameCandidate::new(h..end, CandidateStatus::Complete);
            }
            from = t + 1;
        }

        if len >= window_end {
            // Stale header: cut at the next header inside the window
            let header_len = format.header().len();
            let end = acc
                .find_within(format.header(), h + 1, window_end)
                .unwrap_or(window_end - header_len + 1);
            return FrameCandidate::new(h..end, CandidateStatus::Invalid);
        }

        self.trailer_cursor = from.max((len + 1).saturating_sub(trailer.len()));
        FrameCandidate::new(h..len, CandidateStatus::Incomplete)
    }

    /// Shift all offsets after the accumulator evicted `n` bytes.
    ///
    /// A header inside the evicted prefix is forgotten.
    pub fn consumed(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n);
        self.trailer_cursor = self.trailer_cursor.saturating_sub(n);
        self.header = match self.header {
            Some(h) if h >= n => Some(h - n),
            _ => None,
        };
    }

    /// Forget all progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Frame end implied by the length field of a header at `h`.
fn declared_end(acc: &ByteAccumulator, format: &FrameFormat, h: usize) -> Option<usize> {
    let lf = format.length_field()?;
    let bytes = acc.slice(h + lf.offset, h + lf.offset + lf.width).ok()?;
    let declared = usize::try_from(read_uint(bytes, lf.endianness)).ok()?;
    (h + format.records_offset())
        .checked_add(declared)?
        .checked_add(format.trailer_len())
}

/// First header strictly between `h` and the trailer at `t` that could own
/// a frame ending at `end`.
///
/// Without a length field the span from that header must be a plausible
/// frame. With one, the header's length field must lie before `end` and
/// declare a frame that fits the maximum frame length.
fn inner_header(
    acc: &ByteAccumulator,
    format: &FrameFormat,
    h: usize,
    t: usize,
    end: usize,
) -> Option<usize> {
    let marker = format.header();
    let mut from = h + 1;
    while let Some(next) = acc.find_within(marker, from, t) {
        let owns = match format.length_field() {
            Some(lf) => {
                next + lf.offset + lf.width <= end
                    && declared_end(acc, format, next)
                        .is_some_and(|e| e <= next + format.max_frame_len())
            }
            None => format.is_plausible_len(end - next),
        };
        if owns {
            return Some(next);
        }
        from = next + 1;
    }
    None
}

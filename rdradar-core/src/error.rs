//! Error types for frame synchronization and record decoding

use thiserror::Error;

/// Errors that can occur when decoding a located frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Frame is too short to contain a single record
    #[error("Frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Length field (or fixed frame length) doesn't match actual frame length
    #[error("Length mismatch: header says {header_len} bytes, frame has {actual_len}")]
    LengthMismatch { header_len: usize, actual_len: usize },
}

/// Contract violations on the byte accumulator.
///
/// These indicate a caller bug, not a corrupt stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccumulatorError {
    /// Requested range extends past the buffered bytes
    #[error("Range {start}..{end} out of range for buffer of {len} bytes")]
    OutOfRange { start: usize, end: usize, len: usize },
}

/// Invalid frame format or synchronizer configuration.
///
/// Detected once, when a [`FrameFormat`](crate::format::FrameFormat) or
/// [`FrameSynchronizer`](crate::synchronizer::FrameSynchronizer) is built,
/// never while streaming.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Format '{0}' has an empty header marker")]
    EmptyHeader(String),

    #[error("Format '{0}' has no trailer and no frame length")]
    MissingFrameLength(String),

    #[error("Format '{0}' has an empty trailer marker (omit it for fixed-length framing)")]
    EmptyTrailer(String),

    #[error("Format '{0}' must have a non-zero record stride and slot count")]
    EmptyLayout(String),

    #[error("Field '{field}' has unsupported width {width} (expected 1 to 4 bytes)")]
    InvalidWidth { field: String, width: usize },

    #[error("Field '{field}' at offset {offset} width {width} does not fit in a {stride} byte record")]
    FieldOutOfBounds {
        field: String,
        offset: usize,
        width: usize,
        stride: usize,
    },

    #[error("Format '{format}': records offset {offset} overlaps the header or frame end")]
    InvalidRecordsOffset { format: String, offset: usize },

    #[error("Format '{format}': length field at {offset}..{end} is outside the fixed frame prefix")]
    LengthFieldOutOfBounds {
        format: String,
        offset: usize,
        end: usize,
    },

    #[error("Format '{format}': maximum frame length {max} is below the minimum viable frame of {min} bytes")]
    FrameLengthTooSmall {
        format: String,
        max: usize,
        min: usize,
    },

    #[error("Format '{format}': frames of up to {frame_len} bytes cannot fit a {buffer_len} byte buffer")]
    FrameExceedsBuffer {
        format: String,
        frame_len: usize,
        buffer_len: usize,
    },

    #[error("Maximum frames per call must be at least 1")]
    ZeroBurstLimit,

    #[error("Unknown frame format: {0}")]
    UnknownFormat(String),
}

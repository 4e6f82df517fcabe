//! Streaming frame synchronizer.
//!
//! Owns the accumulator, the locator and the format, and turns appended
//! chunks into an ordered sequence of [`DecodeOutcome`]s. Every discarded
//! byte is accounted for by exactly one error outcome.
//!
//! ```text
//!            header found            trailer / length satisfied
//!  Seeking ───────────────▶ Accumulating ───────────────▶ Ready
//!     ▲                          │                          │
//!     │   invalid (NoTrailer)    │       decode + consume   │
//!     └──────────────────────────┴──────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::accumulator::{ByteAccumulator, DEFAULT_MAX_BUFFER_BYTES};
use crate::decoder::{DecodeOutcome, ErrorKind, RecordDecoder};
use crate::error::ConfigError;
use crate::format::FrameFormat;
use crate::locator::{CandidateStatus, FrameLocator};

/// Default drain loop limit
pub const DEFAULT_MAX_FRAMES_PER_CALL: usize = 64;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Accumulator growth cap while seeking a header
    pub max_buffer_bytes: usize,
    /// Frames resolved per drain before yielding
    pub max_frames_per_call: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            max_frames_per_call: DEFAULT_MAX_FRAMES_PER_CALL,
        }
    }
}

// =============================================================================
// State and Statistics
// =============================================================================

/// Synchronizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// No header located
    Seeking,
    /// Header located, trailer or length not yet satisfied
    Accumulating,
    /// A complete candidate is waiting for decode
    Ready,
}

/// Running counters since construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub bytes_received: u64,
    /// Frames that decoded to Records or Empty
    pub frames_decoded: u64,
    pub records_emitted: u64,
    pub empty_frames: u64,
    /// Bytes covered by error outcomes
    pub bytes_discarded: u64,
    pub truncated: u64,
    pub length_mismatch: u64,
    pub no_trailer: u64,
    pub buffer_overflow: u64,
    pub burst_limit_exceeded: u64,
    pub skipped: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: &DecodeOutcome) {
        match outcome {
            DecodeOutcome::Records { records, .. } => {
                self.frames_decoded += 1;
                self.records_emitted += records.len() as u64;
            }
            DecodeOutcome::Empty { .. } => {
                self.frames_decoded += 1;
                self.empty_frames += 1;
            }
            DecodeOutcome::Error { kind, range } => {
                self.bytes_discarded += range.end - range.start;
                let counter = match kind {
                    ErrorKind::Truncated => &mut self.truncated,
                    ErrorKind::LengthMismatch => &mut self.length_mismatch,
                    ErrorKind::NoTrailer => &mut self.no_trailer,
                    ErrorKind::BufferOverflow => &mut self.buffer_overflow,
                    ErrorKind::BurstLimitExceeded => &mut self.burst_limit_exceeded,
                    ErrorKind::Skipped => &mut self.skipped,
                };
                *counter += 1;
            }
        }
    }

    /// Error outcomes of any kind
    pub fn errors(&self) -> u64 {
        self.truncated
            + self.length_mismatch
            + self.no_trailer
            + self.buffer_overflow
            + self.burst_limit_exceeded
            + self.skipped
    }
}

// =============================================================================
// Frame Synchronizer
// =============================================================================

/// Turns an unbounded byte stream into decoded frames.
///
/// Not shareable between threads while mutating; confine one instance to a
/// single owner.
#[derive(Debug, Clone)]
pub struct FrameSynchronizer {
    format: FrameFormat,
    config: SyncConfig,
    acc: ByteAccumulator,
    locator: FrameLocator,
    state: SyncState,
    /// Stream offset of the first buffered byte
    base: u64,
    stats: SyncStats,
}

impl FrameSynchronizer {
    pub fn new(format: FrameFormat, config: SyncConfig) -> Result<Self, ConfigError> {
        if config.max_frames_per_call == 0 {
            return Err(ConfigError::ZeroBurstLimit);
        }
        if format.max_frame_len() > config.max_buffer_bytes {
            return Err(ConfigError::FrameExceedsBuffer {
                format: format.name().to_string(),
                frame_len: format.max_frame_len(),
                buffer_len: config.max_buffer_bytes,
            });
        }
        Ok(FrameSynchronizer {
            acc: ByteAccumulator::with_capacity(format.max_frame_len() * 4),
            format,
            config,
            locator: FrameLocator::new(),
            state: SyncState::Seeking,
            base: 0,
            stats: SyncStats::default(),
        })
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Bytes waiting for a frame boundary
    pub fn buffered(&self) -> &[u8] {
        self.acc.as_slice()
    }

    /// Stream offset of the first buffered byte
    pub fn stream_offset(&self) -> u64 {
        self.base
    }

    /// Buffer a chunk without processing it.
    pub fn append(&mut self, chunk: &[u8]) {
        self.acc.append(chunk);
        self.stats.bytes_received += chunk.len() as u64;
    }

    /// Append a chunk and drain.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodeOutcome> {
        self.append(chunk);
        self.drain()
    }

    /// Resolve every frame currently available, in stream order.
    pub fn drain(&mut self) -> Vec<DecodeOutcome> {
        let mut out = Vec::new();
        let mut resolved = 0;

        loop {
            let candidate = self.locator.locate(&self.acc, &self.format);
            let status = candidate.status;
            if self.locator.header().is_none() {
                self.state = SyncState::Seeking;
                break;
            }

            let start = candidate.span.start;
            if start > 0 {
                log::debug!(
                    "{}: skipping {} bytes of noise at {}",
                    self.format.name(),
                    start,
                    self.base
                );
                self.discard(start, ErrorKind::Skipped, &mut out);
            }
            let end = candidate.span.end - start;

            match status {
                CandidateStatus::Incomplete => {
                    self.state = SyncState::Accumulating;
                    break;
                }
                _ if resolved == self.config.max_frames_per_call => {
                    self.state = if status == CandidateStatus::Complete {
                        SyncState::Ready
                    } else {
                        SyncState::Accumulating
                    };
                    log::debug!(
                        "{}: burst limit of {} frames reached, deferring the rest",
                        self.format.name(),
                        resolved
                    );
                    self.emit(
                        DecodeOutcome::Error {
                            kind: ErrorKind::BurstLimitExceeded,
                            range: self.base..self.base,
                        },
                        &mut out,
                    );
                    break;
                }
                CandidateStatus::Complete => {
                    self.state = SyncState::Ready;
                    let outcome = match self.acc.slice(0, end) {
                        Ok(frame) => RecordDecoder::new(&self.format).decode(frame, self.base),
                        Err(_) => break,
                    };
                    self.emit(outcome, &mut out);
                    self.advance(end);
                }
                CandidateStatus::Invalid => {
                    log::debug!(
                        "{}: no trailer for header at {}, resynchronizing",
                        self.format.name(),
                        self.base
                    );
                    self.discard(end, ErrorKind::NoTrailer, &mut out);
                }
            }
            self.state = SyncState::Seeking;
            resolved += 1;
        }

        if self.state == SyncState::Seeking && self.acc.len() > self.config.max_buffer_bytes {
            let half = self.acc.len() / 2;
            log::debug!(
                "{}: {} bytes without a header, dropping the oldest {}",
                self.format.name(),
                self.acc.len(),
                half
            );
            self.discard(half, ErrorKind::BufferOverflow, &mut out);
        }

        out
    }

    /// Drop all buffered bytes and start seeking again.
    ///
    /// The dropped bytes are reported as skipped.
    pub fn reset(&mut self) -> Option<DecodeOutcome> {
        let len = self.acc.len() as u64;
        self.acc.clear();
        self.locator.reset();
        self.state = SyncState::Seeking;
        if len == 0 {
            return None;
        }
        let outcome = DecodeOutcome::Error {
            kind: ErrorKind::Skipped,
            range: self.base..self.base + len,
        };
        self.base += len;
        self.stats.record(&outcome);
        Some(outcome)
    }

    fn emit(&mut self, outcome: DecodeOutcome, out: &mut Vec<DecodeOutcome>) {
        self.stats.record(&outcome);
        out.push(outcome);
    }

    fn discard(&mut self, n: usize, kind: ErrorKind, out: &mut Vec<DecodeOutcome>) {
        let range = self.base..self.base + n as u64;
        self.emit(DecodeOutcome::Error { kind, range }, out);
        self.advance(n);
    }

    fn advance(&mut self, n: usize) {
        // n never exceeds the buffered length: it comes from a located span
        if self.acc.consume(n).is_ok() {
            self.locator.consumed(n);
            self.base += n as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats;

    fn rd03d() -> FrameSynchronizer {
        FrameSynchronizer::new(formats::load("rd03d").unwrap(), SyncConfig::default()).unwrap()
    }

    fn slot(x: i16, y: i16, speed: i16, distance: u16) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&x.to_le_bytes());
        v.extend_from_slice(&y.to_le_bytes());
        v.extend_from_slice(&speed.to_le_bytes());
        v.extend_from_slice(&distance.to_le_bytes());
        v
    }

    fn frame(slots: &[Vec<u8>]) -> Vec<u8> {
        let mut v = vec![0xAA, 0xFF, 0x03, 0x00];
        for s in slots {
            v.extend_from_slice(s);
        }
        v.extend_from_slice(&[0x55, 0xCC]);
        v
    }

    /// A stream exercising noise, valid frames, an empty frame, a spurious
    /// header and a truncated frame.
    fn messy_stream() -> Vec<u8> {
        let mut s = vec![0x01, 0x02, 0xAA, 0x03];
        s.extend(frame(&[slot(10, 20, -5, 1500), slot(0, 0, 0, 0), slot(0, 0, 0, 0)]));
        s.extend(frame(&[vec![0; 8], vec![0; 8], vec![0; 8]]));
        s.extend_from_slice(&[0xAA, 0xFF, 0x03, 0x00, 0x42, 0x43]);
        s.extend(frame(&[slot(-1, 300, 12, 301), slot(5, 6, 7, 8), slot(0, 0, 0, 0)]));
        s.extend(frame(&[]));
        s.extend(frame(&[slot(1, 1, 1, 1), slot(0, 0, 0, 0), slot(0, 0, 0, 0)]));
        s.extend_from_slice(&[0x77; 40]);
        s.extend(frame(&[slot(2, 2, 2, 2), slot(0, 0, 0, 0), slot(0, 0, 0, 0)]));
        s.extend_from_slice(&[0xAA, 0xFF]);
        s
    }

    #[test]
    fn test_scenario_single_target() {
        let mut sync = rd03d();
        let mut data = vec![0xAA, 0xFF, 0x03, 0x00];
        data.extend(slot(10, 20, -5, 1500));
        data.extend_from_slice(&[0x55, 0xCC]);

        let out = sync.feed(&data);
        assert_eq!(out.len(), 1);
        let records = out[0].records();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!((r.x, r.y, r.speed, r.distance), (Some(10), Some(20), Some(-5), Some(1500)));
        assert_eq!(sync.state(), SyncState::Seeking);
        assert!(sync.buffered().is_empty());
    }

    #[test]
    fn test_k_records_in_slot_order() {
        let mut sync = rd03d();
        let out = sync.feed(&frame(&[
            slot(1, 2, 3, 4),
            slot(5, 6, 7, 8),
            slot(9, 10, 11, 12),
        ]));
        assert_eq!(out.len(), 1);
        let slots: Vec<usize> = out[0].records().iter().map(|r| r.slot).collect();
        assert_eq!(slots, vec![1, 2, 3]);
    }

    #[test]
    fn test_all_zero_frame_is_empty() {
        let mut sync = rd03d();
        let out = sync.feed(&frame(&[vec![0; 8], vec![0; 8], vec![0; 8]]));
        assert_eq!(out, vec![DecodeOutcome::Empty { range: 0..30 }]);
        assert_eq!(sync.stats().empty_frames, 1);
    }

    /// Feed `stream` whole and in every chunk size up to 64; all must agree.
    fn assert_chunk_independent(format: &str, stream: &[u8]) -> Vec<DecodeOutcome> {
        let new = || {
            FrameSynchronizer::new(formats::load(format).unwrap(), SyncConfig::default()).unwrap()
        };
        let whole = new().feed(stream);
        for chunk_size in 1..=64 {
            let mut sync = new();
            let mut pieces = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                pieces.extend(sync.feed(chunk));
            }
            assert_eq!(pieces, whole, "{} chunk size {}", format, chunk_size);
        }
        whole
    }

    fn kinds(out: &[DecodeOutcome]) -> Vec<Option<ErrorKind>> {
        out.iter().map(|o| o.error_kind()).collect()
    }

    fn rd03_frame(declared: u16, state: u8, range: u16, gates: &[u16; 16]) -> Vec<u8> {
        let mut v = formats::rd03::HEADER.to_vec();
        v.extend_from_slice(&declared.to_le_bytes());
        v.push(state);
        v.extend_from_slice(&range.to_le_bytes());
        for g in gates {
            v.extend_from_slice(&g.to_le_bytes());
        }
        v.extend_from_slice(&formats::rd03::TRAILER);
        v
    }

    /// Energy gates whose bytes contain the rd03 trailer
    fn trailer_like_gates() -> [u16; 16] {
        let mut gates = [0u16; 16];
        gates[3] = 0xF500;
        gates[4] = 0xF7F6;
        gates[5] = 0x00F8;
        gates
    }

    fn legacy_frame(angle: u16, distance: u16, speed: u16) -> Vec<u8> {
        let mut v = vec![0xAA, 0xFF, 0x03, 0x00];
        v.extend_from_slice(&angle.to_le_bytes());
        v.extend_from_slice(&distance.to_le_bytes());
        v.extend_from_slice(&speed.to_le_bytes());
        v.resize(30, 0);
        v
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let stream = messy_stream();
        let whole = assert_chunk_independent("rd03d", &stream);
        assert_eq!(whole.len(), 9);
    }

    #[test]
    fn test_rd03_stream_chunk_independence() {
        let gates: [u16; 16] = std::array::from_fn(|i| i as u16 * 100);
        let mut stream = vec![0x00, 0xF1, 0xF2];
        stream.extend(rd03_frame(35, 1, 250, &gates));
        stream.extend(rd03_frame(35, 1, 310, &trailer_like_gates()));
        // Spurious header whose length field points past the maximum frame
        stream.extend_from_slice(&[0xF1, 0xF2, 0xF3, 0xF4, 0x30, 0x00, 0x07]);
        stream.extend(rd03_frame(35, 2, 120, &gates));
        stream.extend(rd03_frame(30, 1, 99, &gates));
        stream.extend(rd03_frame(35, 0, 0, &[0; 16]));
        stream.extend_from_slice(&[0xF1, 0xF2]);

        let out = assert_chunk_independent("rd03", &stream);
        assert_eq!(
            kinds(&out),
            vec![
                Some(ErrorKind::Skipped),
                None,
                None,
                Some(ErrorKind::NoTrailer),
                None,
                Some(ErrorKind::LengthMismatch),
                None,
            ]
        );
        assert_eq!(out[1].records()[0].distance, Some(250));
        assert_eq!(out[2].range(), &(48..93));
        assert_eq!(out[2].records()[0].distance, Some(310));
        assert_eq!(out[2].records()[0].energy[4], 0xF7F6);
        assert_eq!(out[3].range(), &(93..100));
        assert_eq!(out[4].records()[0].state, Some(2));
        assert!(matches!(out[6], DecodeOutcome::Empty { .. }));
    }

    #[test]
    fn test_rd03_energy_with_trailer_bytes() {
        let mut sync =
            FrameSynchronizer::new(formats::load("rd03").unwrap(), SyncConfig::default()).unwrap();
        let data = rd03_frame(35, 1, 250, &trailer_like_gates());
        let out = sync.feed(&data);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].range(), &(0..45));
        let r = &out[0].records()[0];
        assert_eq!((r.state, r.distance), (Some(1), Some(250)));
        assert!(sync.buffered().is_empty());
    }

    #[test]
    fn test_fixed_length_stream_chunk_independence() {
        let mut stream = vec![0x01, 0x02];
        stream.extend(legacy_frame(33000, 34700, 1));
        stream.extend(legacy_frame(0, 0, 0));
        stream.extend(legacy_frame(30000, 35000, 2));
        stream.extend_from_slice(&[0xAA, 0xFF, 0x03]);

        let out = assert_chunk_independent("rd03d-legacy", &stream);
        assert_eq!(kinds(&out), vec![Some(ErrorKind::Skipped), None, None, None]);
        assert_eq!(out[1].records().len(), 1);
        assert!(matches!(out[2], DecodeOutcome::Empty { .. }));
        assert_eq!(out[3].range(), &(62..92));
    }

    #[test]
    fn test_messy_stream_accounts_for_every_byte() {
        let stream = messy_stream();
        let mut sync = rd03d();
        let out = sync.feed(&stream);

        let kinds: Vec<Option<ErrorKind>> = out.iter().map(|o| o.error_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ErrorKind::Skipped),
                None,
                None,
                Some(ErrorKind::NoTrailer),
                None,
                Some(ErrorKind::Truncated),
                None,
                Some(ErrorKind::Skipped),
                None,
            ]
        );

        // Outcomes tile the consumed prefix of the stream without gaps
        let mut next = 0;
        for o in &out {
            assert_eq!(o.range().start, next);
            next = o.range().end;
        }
        assert_eq!(next, sync.stream_offset());
        assert_eq!(sync.buffered(), &[0xAA, 0xFF]);
        assert_eq!(next as usize + 2, stream.len());
    }

    #[test]
    fn test_spurious_header_recovers() {
        let mut sync = rd03d();
        let mut data = vec![0xAA, 0xFF, 0x03, 0x00, 0x10];
        let valid = frame(&[slot(10, 20, -5, 1500), vec![0; 8], vec![0; 8]]);
        data.extend(&valid);
        let next = frame(&[slot(1, 2, 3, 4), vec![0; 8], vec![0; 8]]);
        data.extend(&next);

        let out = sync.feed(&data);
        assert_eq!(out.len(), 3);
        assert_eq!(
            out[0],
            DecodeOutcome::Error {
                kind: ErrorKind::NoTrailer,
                range: 0..5
            }
        );
        assert_eq!(out[1].records()[0].x, Some(10));
        assert_eq!(out[1].range(), &(5..35));
        assert_eq!(out[2].records()[0].x, Some(1));
    }

    #[test]
    fn test_spurious_header_any_junk_length() {
        let valid = frame(&[slot(10, 20, -5, 1500)]);
        let next = frame(&[slot(1, 2, 3, 4)]);
        for junk in 0..=16u8 {
            let mut data = vec![0xAA, 0xFF, 0x03, 0x00];
            data.extend((0..junk).map(|i| 0x10 + i));
            data.extend(&valid);
            data.extend(&next);
            let start = 4 + junk as u64;

            let out = assert_chunk_independent("rd03d", &data);
            assert_eq!(out.len(), 3, "junk {}", junk);
            assert_eq!(
                out[0],
                DecodeOutcome::Error {
                    kind: ErrorKind::NoTrailer,
                    range: 0..start
                },
                "junk {}",
                junk
            );
            assert_eq!(out[1].range(), &(start..start + 14), "junk {}", junk);
            assert_eq!(out[1].records().len(), 1, "junk {}", junk);
            assert_eq!(out[1].records()[0].x, Some(10), "junk {}", junk);
            assert_eq!(out[2].records()[0].x, Some(1), "junk {}", junk);
        }
    }

    #[test]
    fn test_drain_when_incomplete_is_idempotent() {
        let mut sync = rd03d();
        let data = frame(&[slot(1, 2, 3, 4)]);
        let out = sync.feed(&[&[0x09, 0x09][..], &data[..10]].concat());
        assert_eq!(out.len(), 1); // leading noise
        assert_eq!(sync.state(), SyncState::Accumulating);

        let before = sync.buffered().to_vec();
        let offset = sync.stream_offset();
        assert!(sync.drain().is_empty());
        assert!(sync.drain().is_empty());
        assert_eq!(sync.buffered(), &before[..]);
        assert_eq!(sync.stream_offset(), offset);

        let out = sync.feed(&data[10..]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].records().len(), 1);
    }

    #[test]
    fn test_append_only_buffers() {
        let mut sync = rd03d();
        sync.append(&frame(&[slot(1, 2, 3, 4)]));
        assert_eq!(sync.buffered().len(), 14);
        assert_eq!(sync.stats().bytes_received, 14);
        assert_eq!(sync.drain().len(), 1);
    }

    #[test]
    fn test_burst_limit() {
        let config = SyncConfig {
            max_frames_per_call: 2,
            ..SyncConfig::default()
        };
        let mut sync = FrameSynchronizer::new(formats::load("rd03d").unwrap(), config).unwrap();
        let mut data = Vec::new();
        for i in 1..=5 {
            data.extend(frame(&[slot(i, i, i, i as u16)]));
        }

        let out = sync.feed(&data);
        assert_eq!(out.len(), 3);
        assert_eq!(
            out[2],
            DecodeOutcome::Error {
                kind: ErrorKind::BurstLimitExceeded,
                range: 28..28
            }
        );
        assert_eq!(sync.state(), SyncState::Ready);

        let out = sync.drain();
        assert_eq!(out.len(), 3);
        let out = sync.drain();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].records()[0].x, Some(5));
        assert_eq!(sync.stats().frames_decoded, 5);
        assert_eq!(sync.stats().burst_limit_exceeded, 2);
    }

    #[test]
    fn test_buffer_overflow_while_seeking() {
        let format = formats::load("rd03d").unwrap();
        let config = SyncConfig {
            max_buffer_bytes: 64,
            ..SyncConfig::default()
        };
        let mut sync = FrameSynchronizer::new(format, config).unwrap();

        assert!(sync.feed(&[0x11; 64]).is_empty());
        let out = sync.feed(&[0x11; 2]);
        assert_eq!(
            out,
            vec![DecodeOutcome::Error {
                kind: ErrorKind::BufferOverflow,
                range: 0..33
            }]
        );
        assert_eq!(sync.buffered().len(), 33);

        // Still synchronizes afterwards
        let out = sync.feed(&frame(&[slot(1, 2, 3, 4)]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].error_kind(), Some(ErrorKind::Skipped));
        assert_eq!(out[1].records().len(), 1);
    }

    #[test]
    fn test_config_validation() {
        let format = formats::load("rd03d").unwrap();
        let zero = SyncConfig {
            max_frames_per_call: 0,
            ..SyncConfig::default()
        };
        assert_eq!(
            FrameSynchronizer::new(format.clone(), zero).unwrap_err(),
            ConfigError::ZeroBurstLimit
        );

        let tiny = SyncConfig {
            max_buffer_bytes: 16,
            ..SyncConfig::default()
        };
        assert!(matches!(
            FrameSynchronizer::new(format, tiny),
            Err(ConfigError::FrameExceedsBuffer { frame_len: 30, .. })
        ));
    }

    #[test]
    fn test_stats() {
        let mut sync = rd03d();
        sync.feed(&messy_stream());
        let stats = sync.stats();
        assert_eq!(stats.bytes_received, messy_stream().len() as u64);
        assert_eq!(stats.frames_decoded, 5);
        assert_eq!(stats.empty_frames, 1);
        assert_eq!(stats.records_emitted, 5);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.no_trailer, 1);
        assert_eq!(stats.truncated, 1);
        assert_eq!(stats.errors(), 4);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["framesDecoded"], 5);
    }

    #[test]
    fn test_fixed_length_stream() {
        let mut sync =
            FrameSynchronizer::new(formats::load("rd03d-legacy").unwrap(), SyncConfig::default())
                .unwrap();
        let mut data = vec![0xAA, 0xFF, 0x03, 0x00];
        data.extend_from_slice(&33000u16.to_le_bytes());
        data.extend_from_slice(&34700u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.resize(30, 0);

        let mut out = Vec::new();
        for chunk in data.chunks(4).chain(data.chunks(4)) {
            out.extend(sync.feed(chunk));
        }
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|o| o.records().len() == 1));
    }

    #[test]
    fn test_reset() {
        let mut sync = rd03d();
        sync.feed(&[0xAA, 0xFF, 0x03, 0x00, 0x01]);
        assert_eq!(sync.state(), SyncState::Accumulating);
        let dropped = sync.reset().unwrap();
        assert_eq!(dropped.range(), &(0..5));
        assert_eq!(sync.state(), SyncState::Seeking);
        assert!(sync.reset().is_none());
    }
}

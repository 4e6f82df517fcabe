//! Record decoding for located frames.
//!
//! A [`RecordDecoder`] turns one complete frame into a [`DecodeOutcome`]:
//! the non-null target slots as [`TargetRecord`]s, `Empty` for a valid frame
//! without targets, or an error tagged with the frame's stream range.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::format::{Endianness, FieldKind, FrameFormat, Framing};

// =============================================================================
// Integer helpers
// =============================================================================

/// Read an unsigned integer of `bytes.len()` (1 to 8) bytes.
pub fn read_uint(bytes: &[u8], endianness: Endianness) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    match endianness {
        Endianness::Little => bytes.iter().rev().fold(0, fold),
        Endianness::Big => bytes.iter().fold(0, fold),
    }
}

/// Two's-complement reinterpretation of a `width`-byte unsigned value.
///
/// Values at or above half the unsigned range become `value - range`.
pub fn sign_extend(value: u64, width: usize) -> i64 {
    let bits = (width * 8) as u32;
    if bits == 0 || bits >= 64 {
        return value as i64;
    }
    let range = 1i64 << bits;
    let value = value as i64;
    if value >= range / 2 {
        value - range
    } else {
        value
    }
}

// =============================================================================
// Target Record
// =============================================================================

/// Direction of travel derived from the sign of `speed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    Approaching,
    Receding,
    Stationary,
}

/// One decoded target slot.
///
/// Raw fields are `None` when the format does not carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRecord {
    /// 1-based slot index within the frame
    pub slot: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<i64>,
    /// Calibrated bearing in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_deg: Option<f64>,
    /// Calibrated range in metres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    /// Energy / signal strength values in transmitted order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub energy: Vec<u32>,
}

impl TargetRecord {
    pub fn new(slot: usize) -> Self {
        TargetRecord {
            slot,
            x: None,
            y: None,
            angle: None,
            distance: None,
            speed: None,
            state: None,
            angle_deg: None,
            distance_m: None,
            energy: Vec::new(),
        }
    }

    pub fn get(&self, kind: FieldKind) -> Option<i64> {
        match kind {
            FieldKind::X => self.x,
            FieldKind::Y => self.y,
            FieldKind::Angle => self.angle,
            FieldKind::Distance => self.distance,
            FieldKind::Speed => self.speed,
            FieldKind::State => self.state,
        }
    }

    fn set(&mut self, kind: FieldKind, value: i64) {
        let slot = match kind {
            FieldKind::X => &mut self.x,
            FieldKind::Y => &mut self.y,
            FieldKind::Angle => &mut self.angle,
            FieldKind::Distance => &mut self.distance,
            FieldKind::Speed => &mut self.speed,
            FieldKind::State => &mut self.state,
        };
        *slot = Some(value);
    }

    /// Positive speed is approaching, negative receding
    pub fn motion(&self) -> Option<Motion> {
        self.speed.map(|s| match s {
            s if s > 0 => Motion::Approaching,
            s if s < 0 => Motion::Receding,
            _ => Motion::Stationary,
        })
    }
}

// =============================================================================
// Decode Outcome
// =============================================================================

/// Why bytes were discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Frame shorter than the minimum viable frame
    Truncated,
    /// Declared and observed length disagree
    LengthMismatch,
    /// Header with no acceptable trailer within the maximum frame length
    NoTrailer,
    /// Accumulator cap exceeded while seeking a header
    BufferOverflow,
    /// Drain loop stopped at the frames-per-call limit
    BurstLimitExceeded,
    /// Bytes before a header that belong to no frame
    Skipped,
}

impl From<&ParseError> for ErrorKind {
    fn from(err: &ParseError) -> Self {
        match err {
            ParseError::TooShort { .. } => ErrorKind::Truncated,
            ParseError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
        }
    }
}

/// Result of processing one region of the stream.
///
/// Ranges are absolute stream offsets: bytes counted from the first byte
/// ever appended to the synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DecodeOutcome {
    /// Valid frame with at least one non-null slot, in slot order
    Records {
        range: Range<u64>,
        records: Vec<TargetRecord>,
    },
    /// Valid frame in which every slot is null
    Empty { range: Range<u64> },
    /// Discarded bytes
    Error { kind: ErrorKind, range: Range<u64> },
}

impl DecodeOutcome {
    pub fn range(&self) -> &Range<u64> {
        match self {
            DecodeOutcome::Records { range, .. } => range,
            DecodeOutcome::Empty { range } => range,
            DecodeOutcome::Error { range, .. } => range,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            DecodeOutcome::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn records(&self) -> &[TargetRecord] {
        match self {
            DecodeOutcome::Records { records, .. } => records,
            _ => &[],
        }
    }
}

// =============================================================================
// Record Decoder
// =============================================================================

/// Decodes complete frames of one format.
pub struct RecordDecoder<'a> {
    format: &'a FrameFormat,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(format: &'a FrameFormat) -> Self {
        RecordDecoder { format }
    }

    /// Decode a frame starting at absolute stream offset `offset`.
    pub fn decode(&self, frame: &[u8], offset: u64) -> DecodeOutcome {
        let range = offset..offset + frame.len() as u64;
        match self.parse_frame(frame) {
            Ok(records) if records.is_empty() => DecodeOutcome::Empty { range },
            Ok(records) => DecodeOutcome::Records { range, records },
            Err(e) => {
                log::debug!("{} frame at {}: {}", self.format.name(), offset, e);
                DecodeOutcome::Error {
                    kind: ErrorKind::from(&e),
                    range,
                }
            }
        }
    }

    /// Decode the non-null slots of a frame.
    ///
    /// `frame` runs from the first header byte to the last trailer byte (or
    /// is exactly the fixed frame length).
    pub fn parse_frame(&self, frame: &[u8]) -> Result<Vec<TargetRecord>, ParseError> {
        let format = self.format;
        let len = frame.len();

        if len < format.min_frame_len() {
            return Err(ParseError::TooShort {
                expected: format.min_frame_len(),
                actual: len,
            });
        }
        if let Framing::FixedLength(expected) = format.framing() {
            if len != *expected {
                return Err(ParseError::LengthMismatch {
                    header_len: *expected,
                    actual_len: len,
                });
            }
        }

        let region = &frame[format.records_offset()..len - format.trailer_len()];
        if let Some(lf) = format.length_field() {
            let declared = read_uint(&frame[lf.offset..lf.offset + lf.width], lf.endianness);
            if declared != region.len() as u64 {
                return Err(ParseError::LengthMismatch {
                    header_len: declared as usize,
                    actual_len: region.len(),
                });
            }
        }

        let records = region
            .chunks_exact(format.record_stride())
            .take(format.max_slots())
            .enumerate()
            .filter_map(|(i, slot)| self.decode_slot(i + 1, slot))
            .collect();
        Ok(records)
    }

    /// Decode one slot, or `None` if every field is zero.
    fn decode_slot(&self, index: usize, slot: &[u8]) -> Option<TargetRecord> {
        let mut record = TargetRecord::new(index);
        let mut null = true;

        for field in self.format.fields() {
            let raw = read_uint(&slot[field.offset..field.offset + field.width], field.endianness);
            if raw != 0 {
                null = false;
            }
            let value = if field.signed {
                sign_extend(raw, field.width)
            } else {
                raw as i64
            };
            record.set(field.name, value);
        }
        if null {
            return None;
        }

        if let Some(energy) = self.format.energy() {
            let end = energy.offset + energy.count * energy.width;
            record.energy = slot[energy.offset..end]
                .chunks_exact(energy.width)
                .map(|b| read_uint(b, energy.endianness) as u32)
                .collect();
        }

        self.format.calibration().apply(&mut record);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::format::{EnergySpec, FieldSpec, FrameFormatConfig, LengthField};

    fn rd03d_raw() -> FrameFormat {
        FrameFormat::new(FrameFormatConfig {
            name: "test".to_string(),
            header: vec![0xAA, 0xFF, 0x03, 0x00],
            trailer: Some(vec![0x55, 0xCC]),
            frame_length: None,
            max_frame_length: None,
            records_offset: None,
            record_stride: 8,
            max_slots: 3,
            fields: vec![
                FieldSpec::signed(FieldKind::X, 0, 2),
                FieldSpec::signed(FieldKind::Y, 2, 2),
                FieldSpec::signed(FieldKind::Speed, 4, 2),
                FieldSpec::unsigned(FieldKind::Distance, 6, 2),
            ],
            energy: None,
            length_field: None,
            calibration: Calibration::Raw,
        })
        .unwrap()
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

    #[test]
    fn test_read_uint_endianness() {
        assert_eq!(read_uint(&[0x34, 0x12], Endianness::Little), 0x1234);
        assert_eq!(read_uint(&[0x12, 0x34], Endianness::Big), 0x1234);
        assert_eq!(read_uint(&[0x01, 0x02, 0x03], Endianness::Little), 0x030201);
        assert_eq!(read_uint(&[0xFF], Endianness::Big), 255);
    }

    #[test]
    fn test_sign_extension() {
        let raw = read_uint(&[0xFF, 0xFF], Endianness::Little);
        assert_eq!(raw, 65535);
        assert_eq!(sign_extend(raw, 2), -1);
        assert_eq!(sign_extend(read_uint(&[0x00, 0x80], Endianness::Little), 2), -32768);
        assert_eq!(sign_extend(0x7FFF, 2), 32767);
        assert_eq!(sign_extend(0x80, 1), -128);
        assert_eq!(sign_extend(0x7F, 1), 127);
        assert_eq!(sign_extend(0xFFFF_FFFF, 4), -1);
        assert_eq!(sign_extend(0x00FF_FFFF, 3), -1);
    }

    #[test]
    fn test_single_target_scenario() {
        let format = rd03d_raw();
        let data = frame(&[slot(10, 20, -5, 1500)]);
        assert_eq!(data.len(), 14);

        let outcome = RecordDecoder::new(&format).decode(&data, 0);
        let records = outcome.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slot, 1);
        assert_eq!(records[0].x, Some(10));
        assert_eq!(records[0].y, Some(20));
        assert_eq!(records[0].speed, Some(-5));
        assert_eq!(records[0].distance, Some(1500));
        assert_eq!(records[0].motion(), Some(Motion::Receding));
        assert_eq!(outcome.range(), &(0..14));
    }

    #[test]
    fn test_multiple_slots_in_order() {
        let format = rd03d_raw();
        let data = frame(&[
            slot(1, 100, 3, 100),
            slot(0, 0, 0, 0),
            slot(-300, 900, 0, 950),
        ]);
        let records = RecordDecoder::new(&format).parse_frame(&data).unwrap();
        assert_eq!(records.len(), 2);
        // Null slot 2 is omitted but indices stay stable
        assert_eq!(records[0].slot, 1);
        assert_eq!(records[1].slot, 3);
        assert_eq!(records[1].x, Some(-300));
        assert_eq!(records[0].motion(), Some(Motion::Approaching));
        assert_eq!(records[1].motion(), Some(Motion::Stationary));
    }

    #[test]
    fn test_all_null_slots_is_empty() {
        let format = rd03d_raw();
        let data = frame(&[vec![0; 8], vec![0; 8], vec![0; 8]]);
        let outcome = RecordDecoder::new(&format).decode(&data, 100);
        assert_eq!(outcome, DecodeOutcome::Empty { range: 100..130 });
    }

    #[test]
    fn test_truncated_frame() {
        let format = rd03d_raw();
        let data = frame(&[]);
        assert_eq!(
            RecordDecoder::new(&format).parse_frame(&data),
            Err(ParseError::TooShort {
                expected: 14,
                actual: 6
            })
        );
        let outcome = RecordDecoder::new(&format).decode(&data, 7);
        assert_eq!(
            outcome,
            DecodeOutcome::Error {
                kind: ErrorKind::Truncated,
                range: 7..13
            }
        );
    }

    #[test]
    fn test_fixed_length_frames() {
        let mut config = rd03d_raw().config().clone();
        config.trailer = None;
        config.frame_length = Some(12);
        config.max_slots = 1;
        let format = FrameFormat::new(config).unwrap();
        let decoder = RecordDecoder::new(&format);

        let mut data = vec![0xAA, 0xFF, 0x03, 0x00];
        data.extend(slot(1, 2, 3, 4));
        assert_eq!(decoder.parse_frame(&data).unwrap().len(), 1);
        assert!(matches!(
            decoder.parse_frame(&data[..11]),
            Err(ParseError::TooShort { .. })
        ));
        data.push(0);
        assert!(matches!(
            decoder.parse_frame(&data),
            Err(ParseError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_length_field_and_energy() {
        let format = FrameFormat::new(FrameFormatConfig {
            name: "energy".to_string(),
            header: vec![0xF1, 0xF2],
            trailer: Some(vec![0xF5, 0xF6]),
            frame_length: None,
            max_frame_length: None,
            records_offset: Some(3),
            record_stride: 5,
            max_slots: 1,
            fields: vec![FieldSpec::unsigned(FieldKind::State, 0, 1)],
            energy: Some(EnergySpec {
                offset: 1,
                count: 2,
                width: 2,
                endianness: Endianness::Big,
            }),
            length_field: Some(LengthField {
                offset: 2,
                width: 1,
                endianness: Endianness::Little,
            }),
            calibration: Calibration::Raw,
        })
        .unwrap();
        let decoder = RecordDecoder::new(&format);

        let data = [0xF1, 0xF2, 5, 1, 0x01, 0x00, 0x00, 0x02, 0xF5, 0xF6];
        let records = decoder.parse_frame(&data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, Some(1));
        assert_eq!(records[0].energy, vec![256, 2]);

        let bad = [0xF1, 0xF2, 7, 1, 0x01, 0x00, 0x00, 0x02, 0xF5, 0xF6];
        assert_eq!(
            decoder.parse_frame(&bad),
            Err(ParseError::LengthMismatch {
                header_len: 7,
                actual_len: 5
            })
        );
    }

    #[test]
    fn test_outcome_json() {
        let mut record = TargetRecord::new(1);
        record.distance = Some(1500);
        let outcome = DecodeOutcome::Records {
            range: 0..14,
            records: vec![record],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "records");
        assert_eq!(json["records"][0]["distance"], 1500);
        assert!(json["records"][0].get("x").is_none());
        assert!(json["records"][0].get("energy").is_none());

        let err = DecodeOutcome::Error {
            kind: ErrorKind::NoTrailer,
            range: 3..20,
        };
        assert_eq!(err.error_kind(), Some(ErrorKind::NoTrailer));
        assert!(err.records().is_empty());
    }
}

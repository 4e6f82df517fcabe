//! RD-03 single-target energy report.
//!
//! ```text
//! F1 F2 F3 F4 | len u16 LE | state u8 | range u16 LE cm | 16 x energy u16 LE | F5 F6 F7 F8
//! ```
//!
//! `len` counts the bytes between itself and the trailer.

use crate::calibration::Calibration;
use crate::format::{
    EnergySpec, Endianness, FieldKind, FieldSpec, FrameFormatConfig, LengthField,
};

pub const NAME: &str = "rd03";

pub const HEADER: [u8; 4] = [0xF1, 0xF2, 0xF3, 0xF4];
pub const TRAILER: [u8; 4] = [0xF5, 0xF6, 0xF7, 0xF8];
pub const RANGE_GATES: usize = 16;
pub const RECORD_STRIDE: usize = 3 + RANGE_GATES * 2;
/// Header, length field, one record and trailer
pub const FRAME_LEN: usize = 4 + 2 + RECORD_STRIDE + 4;

pub fn config() -> FrameFormatConfig {
    FrameFormatConfig {
        name: NAME.to_string(),
        header: HEADER.to_vec(),
        trailer: Some(TRAILER.to_vec()),
        frame_length: None,
        max_frame_length: None,
        records_offset: Some(6),
        record_stride: RECORD_STRIDE,
        max_slots: 1,
        fields: vec![
            FieldSpec::unsigned(FieldKind::State, 0, 1),
            FieldSpec::unsigned(FieldKind::Distance, 1, 2),
        ],
        energy: Some(EnergySpec {
            offset: 3,
            count: RANGE_GATES,
            width: 2,
            endianness: Endianness::Little,
        }),
        length_field: Some(LengthField {
            offset: 4,
            width: 2,
            endianness: Endianness::Little,
        }),
        calibration: Calibration::Polar {
            angle_deg_per_unit: 1.0,
            angle_offset_deg: 0.0,
            distance_zero_raw: 0.0,
            distance_units_per_metre: 100.0,
            distance_offset_m: 0.0,
        },
    }
}

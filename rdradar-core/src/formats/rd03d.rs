//! RD-03D multi-target report.
//!
//! ```text
//! AA FF 03 00 | slot 1 (8) | slot 2 (8) | slot 3 (8) | 55 CC
//! slot: x i16 LE mm | y i16 LE mm | speed i16 LE cm/s | distance u16 LE mm
//! ```

use crate::calibration::Calibration;
use crate::format::{FieldKind, FieldSpec, FrameFormatConfig};

pub const NAME: &str = "rd03d";

pub const HEADER: [u8; 4] = [0xAA, 0xFF, 0x03, 0x00];
pub const TRAILER: [u8; 2] = [0x55, 0xCC];
pub const RECORD_STRIDE: usize = 8;
pub const MAX_TARGETS: usize = 3;

pub fn config() -> FrameFormatConfig {
    FrameFormatConfig {
        name: NAME.to_string(),
        header: HEADER.to_vec(),
        trailer: Some(TRAILER.to_vec()),
        frame_length: None,
        max_frame_length: None,
        records_offset: None,
        record_stride: RECORD_STRIDE,
        max_slots: MAX_TARGETS,
        fields: vec![
            FieldSpec::signed(FieldKind::X, 0, 2),
            FieldSpec::signed(FieldKind::Y, 2, 2),
            FieldSpec::signed(FieldKind::Speed, 4, 2),
            FieldSpec::unsigned(FieldKind::Distance, 6, 2),
        ],
        energy: None,
        length_field: None,
        calibration: Calibration::Cartesian {
            metres_per_unit: 0.001,
        },
    }
}

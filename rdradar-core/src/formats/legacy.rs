//! Early RD-03D single-target interpretation.
//!
//! Fixed 30-byte frames, one slot right after the header holding angle,
//! distance and speed as unsigned u16 LE readings. Converted with the
//! bench-measured polar constants.

use crate::calibration::Calibration;
use crate::format::{FieldKind, FieldSpec, FrameFormatConfig};

pub const NAME: &str = "rd03d-legacy";

pub const HEADER: [u8; 4] = [0xAA, 0xFF, 0x03, 0x00];
pub const FRAME_LEN: usize = 30;

pub fn config() -> FrameFormatConfig {
    FrameFormatConfig {
        name: NAME.to_string(),
        header: HEADER.to_vec(),
        trailer: None,
        frame_length: Some(FRAME_LEN),
        max_frame_length: None,
        records_offset: None,
        record_stride: 6,
        max_slots: 1,
        fields: vec![
            FieldSpec::unsigned(FieldKind::Angle, 0, 2),
            FieldSpec::unsigned(FieldKind::Distance, 2, 2),
            FieldSpec::unsigned(FieldKind::Speed, 4, 2),
        ],
        energy: None,
        length_field: None,
        calibration: Calibration::legacy(),
    }
}

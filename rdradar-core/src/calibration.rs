//! Conversion of raw field values into degrees and metres.
//!
//! Constants differ per hardware revision, so they live in the frame format
//! rather than in code.

use serde::{Deserialize, Serialize};

use crate::decoder::TargetRecord;

/// Legacy single-target board: raw angle reading spanning the full angle range
pub const LEGACY_ANGLE_FULL_SCALE: f64 = 33000.0;
/// Legacy single-target board: degrees covered by that range
pub const LEGACY_ANGLE_SPAN_DEG: f64 = 60.0;
/// Legacy single-target board: raw distance reading at one metre
pub const LEGACY_DISTANCE_ZERO: f64 = 33900.0;
/// Legacy single-target board: raw distance units per metre
pub const LEGACY_DISTANCE_UNITS_PER_METRE: f64 = 800.0;

/// How raw values map to physical units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Calibration {
    /// Report raw values only
    #[default]
    Raw,
    /// Positions are x/y in fixed units; angle is the bearing off boresight
    Cartesian { metres_per_unit: f64 },
    /// Linear scale and offset on the angle and distance fields
    Polar {
        angle_deg_per_unit: f64,
        angle_offset_deg: f64,
        distance_zero_raw: f64,
        distance_units_per_metre: f64,
        distance_offset_m: f64,
    },
}

impl Calibration {
    /// Bench-measured constants of the early single-target firmware
    pub fn legacy() -> Self {
        Calibration::Polar {
            angle_deg_per_unit: LEGACY_ANGLE_SPAN_DEG / LEGACY_ANGLE_FULL_SCALE,
            angle_offset_deg: -LEGACY_ANGLE_SPAN_DEG,
            distance_zero_raw: LEGACY_DISTANCE_ZERO,
            distance_units_per_metre: LEGACY_DISTANCE_UNITS_PER_METRE,
            distance_offset_m: 1.0,
        }
    }

    /// Fill in `angle_deg` / `distance_m` from whatever raw fields are present.
    pub fn apply(&self, record: &mut TargetRecord) {
        match *self {
            Calibration::Raw => {}
            Calibration::Cartesian { metres_per_unit } => {
                if let (Some(x), Some(y)) = (record.x, record.y) {
                    let (x, y) = (x as f64, y as f64);
                    record.angle_deg = Some(x.atan2(y).to_degrees());
                    record.distance_m = Some(x.hypot(y) * metres_per_unit);
                }
                if let Some(d) = record.distance {
                    record.distance_m = Some(d as f64 * metres_per_unit);
                }
            }
            Calibration::Polar {
                angle_deg_per_unit,
                angle_offset_deg,
                distance_zero_raw,
                distance_units_per_metre,
                distance_offset_m,
            } => {
                if let Some(a) = record.angle {
                    record.angle_deg = Some(a as f64 * angle_deg_per_unit + angle_offset_deg);
                }
                if let Some(d) = record.distance {
                    if distance_units_per_metre != 0.0 {
                        record.distance_m = Some(
                            (d as f64 - distance_zero_raw) / distance_units_per_metre
                                + distance_offset_m,
                        );
                    }
                }
            }
        }
    }
}

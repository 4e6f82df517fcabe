//! Built-in Frame Format Database
//!
//! Known hardware revisions with their markers, record layouts and
//! calibration. Each entry is a plain [`FrameFormatConfig`], so a user format
//! file can start from any of them.

use crate::error::ConfigError;
use crate::format::{FrameFormat, FrameFormatConfig};

pub mod legacy;
pub mod rd03;
pub mod rd03d;

/// Format used when none is requested
pub const DEFAULT_FORMAT: &str = rd03d::NAME;

/// Names of all built-in formats
pub fn names() -> &'static [&'static str] {
    &[rd03d::NAME, rd03::NAME, legacy::NAME]
}

/// Look up a built-in format configuration by name (case-insensitive)
///
/// Returns None if the name is not in the database.
pub fn get(name: &str) -> Option<FrameFormatConfig> {
    match name.to_ascii_lowercase().as_str() {
        rd03d::NAME => Some(rd03d::config()),
        rd03::NAME => Some(rd03::config()),
        legacy::NAME => Some(legacy::config()),
        _ => None,
    }
}

/// Look up and validate a built-in format
pub fn load(name: &str) -> Result<FrameFormat, ConfigError> {
    let config = get(name).ok_or_else(|| ConfigError::UnknownFormat(name.to_string()))?;
    FrameFormat::new(config)
}

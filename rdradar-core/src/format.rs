//! Data-driven frame format descriptions.
//!
//! One [`FrameFormat`] replaces a hand-written decoder per hardware revision:
//! markers, framing, record layout, per-field decode rules and calibration are
//! all configuration. Formats are written as a [`FrameFormatConfig`] (the
//! serde form, loadable from JSON) and validated into a [`FrameFormat`] once,
//! before any bytes are streamed.
//!
//! ```text
//!  frame start                                                  frame end
//!  │ header │ (length field) │ slot 1 │ slot 2 │ ... │ slot n │ trailer │
//!  └────────────────────────┘▲
//!                            records offset
//! ```

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::ConfigError;

// =============================================================================
// Serde helpers for marker bytes <-> "AA FF 03 00"
// =============================================================================

/// Parse a hex marker such as `"AA FF 03 00"` or `"aaff0300"`.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex digit '{}' in '{}'", bad, s));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", s));
    }
    // All ASCII from here on, so byte indices are char boundaries
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("Invalid hex byte '{}' in '{}'", &digits[i..i + 2], s))
        })
        .collect()
}

/// Format bytes as upper-case, space separated hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

mod hex_bytes_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrBytes {
        Hex(String),
        Bytes(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        match HexOrBytes::deserialize(d)? {
            HexOrBytes::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            HexOrBytes::Bytes(b) => Ok(b),
        }
    }
}

mod option_hex_bytes_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&to_hex(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "hex_bytes_serde")] Vec<u8>);

        let opt: Option<Wrapper> = Option::deserialize(d)?;
        Ok(opt.map(|w| w.0))
    }
}

// =============================================================================
// Field Layout
// =============================================================================

/// Byte order of a multi-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Measurement carried by a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Lateral position
    X,
    /// Forward position
    Y,
    /// Raw bearing value
    Angle,
    /// Raw range value
    Distance,
    /// Radial speed, signed: positive is approaching
    Speed,
    /// Target state / presence flag
    State,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::X => "x",
            FieldKind::Y => "y",
            FieldKind::Angle => "angle",
            FieldKind::Distance => "distance",
            FieldKind::Speed => "speed",
            FieldKind::State => "state",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decode rule for one field of a record slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: FieldKind,
    /// Byte offset relative to the slot start
    pub offset: usize,
    /// Width in bytes (1 to 4)
    pub width: usize,
    /// Two's-complement signed
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub endianness: Endianness,
}

impl FieldSpec {
    pub const fn unsigned(name: FieldKind, offset: usize, width: usize) -> Self {
        FieldSpec {
            name,
            offset,
            width,
            signed: false,
            endianness: Endianness::Little,
        }
    }

    pub const fn signed(name: FieldKind, offset: usize, width: usize) -> Self {
        FieldSpec {
            name,
            offset,
            width,
            signed: true,
            endianness: Endianness::Little,
        }
    }
}

/// Array of unsigned energy / signal-strength values embedded in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySpec {
    /// Byte offset relative to the slot start
    pub offset: usize,
    /// Number of values
    pub count: usize,
    /// Width of each value in bytes (1 to 4)
    pub width: usize,
    #[serde(default)]
    pub endianness: Endianness,
}

/// Explicit length field giving the byte length of the record region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthField {
    /// Byte offset relative to the frame start
    pub offset: usize,
    pub width: usize,
    #[serde(default)]
    pub endianness: Endianness,
}

// =============================================================================
// Frame Format Configuration
// =============================================================================

/// Serde form of a frame format, as written in a format file.
///
/// With a `trailer` the frame is delimited by that marker and `frame_length`
/// is ignored; without one, `frame_length` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameFormatConfig {
    pub name: String,
    #[serde(with = "hex_bytes_serde")]
    pub header: Vec<u8>,
    #[serde(
        default,
        with = "option_hex_bytes_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub trailer: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_length: Option<usize>,
    /// Trailer formats only: longest acceptable frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frame_length: Option<usize>,
    /// Offset of the first slot; defaults to the header length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_offset: Option<usize>,
    pub record_stride: usize,
    pub max_slots: usize,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_field: Option<LengthField>,
    #[serde(default)]
    pub calibration: Calibration,
}

/// How the end of a frame is found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Frame ends with this marker
    Trailer(Vec<u8>),
    /// Frame is exactly this many bytes, header included
    FixedLength(usize),
}

/// A validated frame format.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFormat {
    config: FrameFormatConfig,
    framing: Framing,
    records_offset: usize,
    min_frame_len: usize,
    max_frame_len: usize,
}

impl FrameFormat {
    /// Validate a configuration.
    pub fn new(config: FrameFormatConfig) -> Result<Self, ConfigError> {
        let name = config.name.clone();

        if config.header.is_empty() {
            return Err(ConfigError::EmptyHeader(name));
        }
        let framing = match (&config.trailer, config.frame_length) {
            (Some(t), _) if t.is_empty() => return Err(ConfigError::EmptyTrailer(name)),
            (Some(t), _) => Framing::Trailer(t.clone()),
            (None, Some(len)) => Framing::FixedLength(len),
            (None, None) => return Err(ConfigError::MissingFrameLength(name)),
        };
        if config.record_stride == 0 || config.max_slots == 0 {
            return Err(ConfigError::EmptyLayout(name));
        }

        let stride = config.record_stride;
        for field in &config.fields {
            check_span(field.name.as_str(), field.offset, field.width, 1, stride)?;
        }
        if let Some(energy) = &config.energy {
            check_span("energy", energy.offset, energy.width, energy.count, stride)?;
        }

        let records_offset = config.records_offset.unwrap_or(config.header.len());
        if records_offset < config.header.len() {
            return Err(ConfigError::InvalidRecordsOffset {
                format: name,
                offset: records_offset,
            });
        }
        if let Some(lf) = &config.length_field {
            check_width("length", lf.width)?;
            let end = lf.offset.saturating_add(lf.width);
            if lf.offset < config.header.len() || end > records_offset {
                return Err(ConfigError::LengthFieldOutOfBounds {
                    format: name,
                    offset: lf.offset,
                    end,
                });
            }
        }

        let (min_frame_len, max_frame_len) = match &framing {
            Framing::Trailer(t) => {
                let min = records_offset + stride + t.len();
                let max = config
                    .max_frame_length
                    .unwrap_or(
                        stride
                            .saturating_mul(config.max_slots)
                            .saturating_add(records_offset + t.len()),
                    );
                (min, max)
            }
            Framing::FixedLength(len) => (records_offset + stride, *len),
        };
        if max_frame_len < min_frame_len {
            return Err(ConfigError::FrameLengthTooSmall {
                format: name,
                max: max_frame_len,
                min: min_frame_len,
            });
        }

        let min_frame_len = match framing {
            Framing::FixedLength(len) => len,
            Framing::Trailer(_) => min_frame_len,
        };

        Ok(FrameFormat {
            config,
            framing,
            records_offset,
            min_frame_len,
            max_frame_len,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn header(&self) -> &[u8] {
        &self.config.header
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    pub fn trailer(&self) -> Option<&[u8]> {
        match &self.framing {
            Framing::Trailer(t) => Some(t),
            Framing::FixedLength(_) => None,
        }
    }

    pub fn trailer_len(&self) -> usize {
        self.trailer().map_or(0, |t| t.len())
    }

    pub fn records_offset(&self) -> usize {
        self.records_offset
    }

    pub fn record_stride(&self) -> usize {
        self.config.record_stride
    }

    pub fn max_slots(&self) -> usize {
        self.config.max_slots
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.config.fields
    }

    pub fn energy(&self) -> Option<&EnergySpec> {
        self.config.energy.as_ref()
    }

    pub fn length_field(&self) -> Option<&LengthField> {
        self.config.length_field.as_ref()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.config.calibration
    }

    /// Smallest frame that can hold one record
    pub fn min_frame_len(&self) -> usize {
        self.min_frame_len
    }

    /// Largest frame the locator will accept
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn config(&self) -> &FrameFormatConfig {
        &self.config
    }

    /// Check whether a trailer ending a frame of `frame_len` bytes can be real.
    ///
    /// Without a length field the record region must hold a whole number of
    /// slots; with one, any length is passed on and checked by the decoder.
    pub fn is_plausible_len(&self, frame_len: usize) -> bool {
        if frame_len > self.max_frame_len {
            return false;
        }
        if self.config.length_field.is_some() {
            return true;
        }
        match frame_len.checked_sub(self.records_offset + self.trailer_len()) {
            Some(region) => region % self.config.record_stride == 0,
            None => false,
        }
    }
}

impl TryFrom<FrameFormatConfig> for FrameFormat {
    type Error = ConfigError;

    fn try_from(config: FrameFormatConfig) -> Result<Self, Self::Error> {
        FrameFormat::new(config)
    }
}

fn check_width(field: &str, width: usize) -> Result<(), ConfigError> {
    if (1..=4).contains(&width) {
        Ok(())
    } else {
        Err(ConfigError::InvalidWidth {
            field: field.to_string(),
            width,
        })
    }
}

fn check_span(
    field: &str,
    offset: usize,
    width: usize,
    count: usize,
    stride: usize,
) -> Result<(), ConfigError> {
    check_width(field, width)?;
    let span = width.checked_mul(count);
    let fits = span
        .and_then(|span| offset.checked_add(span))
        .is_some_and(|end| end <= stride);
    if !fits {
        return Err(ConfigError::FieldOutOfBounds {
            field: field.to_string(),
            offset,
            width: span.unwrap_or(usize::MAX),
            stride,
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

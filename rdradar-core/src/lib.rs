//! # rdradar Core
//!
//! Platform-independent frame synchronizer and target decoder for RD-03
//! series mmWave radar streams.
//!
//! This crate contains pure parsing logic with **zero I/O dependencies**: it is
//! fed raw byte chunks from any transport and hands back decoded target
//! records. Serial ports, replay files and network consumers live in
//! `rdradar-server`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  rdradar-core (platform-independent, no tokio/async deps)   │
//! │  ├── accumulator/  (append-only byte buffer)                │
//! │  ├── locator/      (header / trailer search)                │
//! │  ├── decoder/      (slot decoding, sign extension)          │
//! │  ├── synchronizer/ (state machine, resynchronization)       │
//! │  └── format/       (data-driven frame layouts)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  rdradar-server         │
//!                 │  (serial, replay, web)  │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Built-in Formats
//!
//! | Name           | Markers                      | Targets | Framing          |
//! |----------------|------------------------------|---------|------------------|
//! | `rd03d`        | `AA FF 03 00` .. `55 CC`     | 3       | trailer          |
//! | `rd03`         | `F1 F2 F3 F4` .. `F5 F6 F7 F8` | 1 + energy | trailer + length |
//! | `rd03d-legacy` | `AA FF 03 00`                | 1       | fixed 30 bytes   |
//!
//! ## Example
//!
//! ```rust
//! use rdradar_core::{formats, DecodeOutcome, FrameSynchronizer, SyncConfig};
//!
//! let format = formats::load("rd03d").unwrap();
//! let mut sync = FrameSynchronizer::new(format, SyncConfig::default()).unwrap();
//!
//! let frame = [
//!     0xAA, 0xFF, 0x03, 0x00, // header
//!     0x0A, 0x00, 0x14, 0x00, 0xFB, 0xFF, 0xDC, 0x05, // x=10 y=20 speed=-5 distance=1500
//!     0x55, 0xCC, // trailer
//! ];
//! for outcome in sync.feed(&frame[..7]).into_iter().chain(sync.feed(&frame[7..])) {
//!     if let DecodeOutcome::Records { records, .. } = outcome {
//!         assert_eq!(records[0].speed, Some(-5));
//!     }
//! }
//! ```

pub mod accumulator;
pub mod calibration;
pub mod decoder;
pub mod error;
pub mod format;
pub mod formats;
pub mod locator;
pub mod synchronizer;

// Re-export commonly used types
pub use accumulator::ByteAccumulator;
pub use calibration::Calibration;
pub use decoder::{DecodeOutcome, ErrorKind, Motion, RecordDecoder, TargetRecord};
pub use error::{AccumulatorError, ConfigError, ParseError};
pub use format::{
    EnergySpec, Endianness, FieldKind, FieldSpec, FrameFormat, FrameFormatConfig, Framing,
    LengthField,
};
pub use locator::{CandidateStatus, FrameCandidate, FrameLocator};
pub use synchronizer::{FrameSynchronizer, SyncConfig, SyncState, SyncStats};

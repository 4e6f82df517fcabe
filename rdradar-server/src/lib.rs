//! # rdradar Server
//!
//! Serial bridge for RD-03 series mmWave radars with REST API and WebSocket
//! target streaming.
//!
//! This crate wires a byte source to the [`rdradar_core`] frame synchronizer:
//! - Reads the radar's UART, or replays a binary / hex-text capture
//! - Decodes frames in a single pipeline task that owns the synchronizer
//! - Streams decoded targets via WebSocket and optionally to stdout
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    rdradar-server                       │
//! │  ┌─────────────┐   mpsc    ┌──────────────────────────┐ │
//! │  │ Source      │ ────────▶ │ Pipeline                 │ │
//! │  │ (serial /   │  chunks   │ owns FrameSynchronizer   │ │
//! │  │  replay)    │           └────────────┬─────────────┘ │
//! │  └─────────────┘                        │ broadcast     │
//! │                                         ▼               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │              Session (Arc<RwLock>)                  ││
//! │  │  - Active format                                    ││
//! │  │  - Synchronizer state and statistics                ││
//! │  │  - TargetMessage broadcast                          ││
//! │  └─────────────────────────────────────────────────────┘│
//! │         │                                               │
//! │         ▼                                               │
//! │  ┌─────────────┐  ┌─────────────┐                       │
//! │  │ REST API    │  │ WebSocket   │                       │
//! │  │ (axum)      │  │ (targets)   │                       │
//! │  └─────────────┘  └─────────────┘                       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! Served by the `web` module in `main.rs` when `--port` is given:
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `GET /api/v1/status` | Version, format, synchronizer state and statistics |
//! | `GET /api/v1/format` | Active frame format configuration |
//! | `WS /api/v1/targets` | WebSocket stream of decoded targets |
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `--device`, `--baud` - Serial port (default `/dev/ttyTHS1` at 256000 baud)
//! - `--format` - Built-in or user format name (default `rd03d`)
//! - `--replay` - Replay a capture instead of reading the serial port
//! - `-p, --port` - Enable the HTTP / WebSocket API
//! - `-v` - Increase verbosity (use multiple times)

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use clap::Parser;
use rdradar_core::{
    accumulator::DEFAULT_MAX_BUFFER_BYTES, formats, synchronizer::DEFAULT_MAX_FRAMES_PER_CALL,
    FrameFormatConfig, SyncConfig, SyncState, SyncStats,
};
use tokio::sync::broadcast;

pub mod config;
pub mod pipeline;
pub mod source;

use pipeline::TargetMessage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decoded frames kept for slow WebSocket clients
const TARGET_CHANNEL_CAPACITY: usize = 64;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Frame format: a built-in name or `<name>.json` in the formats config directory
    #[arg(short, long, default_value = formats::DEFAULT_FORMAT)]
    pub format: String,

    /// Load the frame format from this JSON file instead
    #[arg(long)]
    pub format_file: Option<PathBuf>,

    /// Serial device the radar is connected to
    #[arg(short, long, default_value = "/dev/ttyTHS1")]
    pub device: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 256000)]
    pub baud: u32,

    /// Replay a capture instead of reading the serial port.
    /// Files ending in `.hex` or `.txt` are read as hex text, others as raw bytes.
    #[arg(short, long)]
    pub replay: Option<PathBuf>,

    /// Bytes per chunk when replaying a raw capture
    #[arg(long, default_value_t = 64)]
    pub replay_chunk: usize,

    /// Delay between replayed chunks
    #[arg(long, default_value_t = 10)]
    pub replay_interval_ms: u64,

    /// Accumulator cap while no frame header is found
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFER_BYTES)]
    pub max_buffer_bytes: usize,

    /// Frames decoded per chunk before yielding
    #[arg(long, default_value_t = DEFAULT_MAX_FRAMES_PER_CALL)]
    pub max_frames_per_call: usize,

    /// Write each decoded frame as a JSON line to stdout
    #[arg(long, default_value_t = false)]
    pub output: bool,

    /// Port for the HTTP / WebSocket API (disabled when absent)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Print the built-in format names and exit
    #[arg(long, default_value_t = false)]
    pub list_formats: bool,

    /// Write the resolved format as JSON to this file and exit,
    /// e.g. to start a user format from a built-in one
    #[arg(long)]
    pub save_format: Option<PathBuf>,
}

impl Cli {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_buffer_bytes: self.max_buffer_bytes,
            max_frames_per_call: self.max_frames_per_call,
        }
    }
}

pub struct SessionInner {
    pub args: Cli,
    /// Active frame format
    pub format: FrameFormatConfig,
    /// Last synchronizer state seen by the pipeline
    pub state: SyncState,
    pub stats: SyncStats,
    pub tx_targets: broadcast::Sender<TargetMessage>,
}

#[derive(Clone)]
pub struct Session {
    pub inner: Arc<RwLock<SessionInner>>,
}

impl Session {
    pub fn new(args: Cli, format: FrameFormatConfig) -> Self {
        let (tx_targets, _) = broadcast::channel(TARGET_CHANNEL_CAPACITY);
        Session {
            inner: Arc::new(RwLock::new(SessionInner {
                args,
                format,
                state: SyncState::Seeking,
                stats: SyncStats::default(),
                tx_targets,
            })),
        }
    }

    /// A panic while holding the lock leaves plain data behind; keep using it
    pub fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn args(&self) -> Cli {
        self.read().args.clone()
    }

    pub fn targets_sender(&self) -> broadcast::Sender<TargetMessage> {
        self.read().tx_targets.clone()
    }

    pub fn subscribe_targets(&self) -> broadcast::Receiver<TargetMessage> {
        self.read().tx_targets.subscribe()
    }

    pub fn update_sync(&self, state: SyncState, stats: &SyncStats) {
        let mut inner = self.write();
        inner.state = state;
        inner.stats = stats.clone();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session {{ format: {} }}", self.read().format.name)
    }
}

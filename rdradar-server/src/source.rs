//! Byte sources feeding the pipeline.
//!
//! Each source runs as its own subsystem and hands raw chunks over a bounded
//! channel. A source stops when shutdown is requested, when the pipeline
//! closes the channel, or (for replays) at the end of the capture.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serialport::SerialPort;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::Cli;

/// Serial reads block at most this long before checking for shutdown
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(100);
const SERIAL_BUFFER_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot open serial port {path}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Read from serial port {path} failed")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read capture {path}")]
    Capture {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serial reader task failed: {0}")]
    Task(String),
}

/// Where raw bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteSource {
    Serial {
        path: String,
        baud: u32,
    },
    /// Raw capture, replayed in fixed-size chunks
    Binary {
        path: PathBuf,
        chunk: usize,
        interval: Duration,
    },
    /// Hex dump text, replayed one line per chunk
    HexText { path: PathBuf, interval: Duration },
}

impl ByteSource {
    pub fn from_args(args: &Cli) -> Self {
        let interval = Duration::from_millis(args.replay_interval_ms);
        match &args.replay {
            Some(path) if is_hex_capture(path) => ByteSource::HexText {
                path: path.clone(),
                interval,
            },
            Some(path) => ByteSource::Binary {
                path: path.clone(),
                chunk: args.replay_chunk.max(1),
                interval,
            },
            None => ByteSource::Serial {
                path: args.device.clone(),
                baud: args.baud,
            },
        }
    }

    pub async fn run(
        self,
        subsys: SubsystemHandle,
        tx: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), SourceError> {
        match self {
            ByteSource::Serial { path, baud } => run_serial(path, baud, subsys, tx).await,
            ByteSource::Binary {
                path,
                chunk,
                interval,
            } => {
                let data = read_capture(&path)?;
                let chunks = data.chunks(chunk).map(<[u8]>::to_vec).collect();
                info!("Replaying {} bytes from {}", data.len(), path.display());
                replay(chunks, interval, subsys, tx).await
            }
            ByteSource::HexText { path, interval } => {
                let data = read_capture(&path)?;
                let text = String::from_utf8_lossy(&data);
                let chunks = parse_hex_lines(&text);
                info!(
                    "Replaying {} hex lines from {}",
                    chunks.len(),
                    path.display()
                );
                replay(chunks, interval, subsys, tx).await
            }
        }
    }
}

fn is_hex_capture(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("hex") | Some("txt")
    )
}

fn read_capture(path: &Path) -> Result<Vec<u8>, SourceError> {
    fs::read(path).map_err(|source| SourceError::Capture {
        path: path.to_owned(),
        source,
    })
}

// =============================================================================
// Hex text captures
// =============================================================================

/// Parse one line of a hex dump.
///
/// Only whitespace-separated tokens of exactly two hex digits count as bytes,
/// so prefixes such as `Raw Data (Hex):` and status lines are ignored.
pub fn parse_hex_line(line: &str) -> Vec<u8> {
    line.split_whitespace()
        .filter(|token| token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit()))
        .filter_map(|token| u8::from_str_radix(token, 16).ok())
        .collect()
}

/// Parse a hex dump into chunks, one per line that carries bytes.
pub fn parse_hex_lines(text: &str) -> Vec<Vec<u8>> {
    text.lines()
        .map(parse_hex_line)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

// =============================================================================
// Replay
// =============================================================================

async fn replay(
    chunks: Vec<Vec<u8>>,
    interval: Duration,
    subsys: SubsystemHandle,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<(), SourceError> {
    let total = chunks.len();
    for (i, chunk) in chunks.into_iter().enumerate() {
        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                debug!("Replay stopped after {} of {} chunks", i, total);
                return Ok(());
            },
            r = tx.send(chunk) => {
                if r.is_err() {
                    debug!("Pipeline closed, stopping replay");
                    return Ok(());
                }
            }
        }
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    info!("Replay finished ({} chunks)", total);
    Ok(())
}

// =============================================================================
// Serial port
// =============================================================================

async fn run_serial(
    path: String,
    baud: u32,
    subsys: SubsystemHandle,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<(), SourceError> {
    let port = serialport::new(&path, baud)
        .timeout(SERIAL_READ_TIMEOUT)
        .open()
        .map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
    info!("Listening on {} at {} baud", path, baud);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_reader = stop.clone();
    let mut reader = tokio::task::spawn_blocking(move || read_serial(port, path, tx, stop_reader));

    tokio::select! {
        _ = subsys.on_shutdown_requested() => {
            stop.store(true, Ordering::Relaxed);
        },
        r = &mut reader => return join_reader(r),
    }
    // The reader notices the stop flag within one read timeout
    join_reader(reader.await)
}

fn join_reader(
    r: Result<Result<(), SourceError>, tokio::task::JoinError>,
) -> Result<(), SourceError> {
    r.map_err(|e| SourceError::Task(e.to_string()))?
}

fn read_serial(
    mut port: Box<dyn SerialPort>,
    path: String,
    tx: mpsc::Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
) -> Result<(), SourceError> {
    let mut buf = [0u8; SERIAL_BUFFER_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    debug!("Pipeline closed, stopping serial reader");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                warn!("Serial read on {} interrupted, retrying", path);
            }
            Err(source) => return Err(SourceError::Read { path, source }),
        }
    }
    Ok(())
}

//! The decode pipeline: exclusive owner of the frame synchronizer.
//!
//! Chunks arrive from the byte source; every outcome is logged, valid frames
//! are published as [`TargetMessage`]s, and the synchronizer statistics are
//! copied into the [`Session`] after each chunk.

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use rdradar_core::{DecodeOutcome, ErrorKind, FrameSynchronizer, TargetRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_graceful_shutdown::SubsystemHandle;

use crate::Session;

/// One decoded frame as sent to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMessage {
    pub timestamp: DateTime<Utc>,
    /// Stream offset of the frame's first byte
    pub offset: u64,
    pub format: String,
    /// Empty for a valid frame without targets
    pub targets: Vec<TargetRecord>,
}

impl TargetMessage {
    pub fn from_outcome(outcome: &DecodeOutcome, format: &str) -> Option<Self> {
        let targets = match outcome {
            DecodeOutcome::Records { records, .. } => records.clone(),
            DecodeOutcome::Empty { .. } => Vec::new(),
            DecodeOutcome::Error { .. } => return None,
        };
        Some(TargetMessage {
            timestamp: Utc::now(),
            offset: outcome.range().start,
            format: format.to_string(),
            targets,
        })
    }
}

pub struct Pipeline {
    session: Session,
    sync: FrameSynchronizer,
    rx: mpsc::Receiver<Vec<u8>>,
    tx_targets: broadcast::Sender<TargetMessage>,
    output: bool,
}

impl Pipeline {
    pub fn new(session: Session, sync: FrameSynchronizer, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        let tx_targets = session.targets_sender();
        let output = session.read().args.output;
        Pipeline {
            session,
            sync,
            rx,
            tx_targets,
            output,
        }
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> miette::Result<()> {
        info!(
            "Decoding {} frames (max frame {} bytes)",
            self.sync.format().name(),
            self.sync.format().max_frame_len()
        );
        loop {
            tokio::select! { biased;
                _ = subsys.on_shutdown_requested() => {
                    break;
                },
                r = self.rx.recv() => match r {
                    Some(chunk) => {
                        self.process_chunk(&chunk);
                    }
                    None => {
                        info!("Byte source finished");
                        self.finish();
                        subsys.request_shutdown();
                        break;
                    }
                }
            }
        }
        let stats = self.sync.stats();
        info!(
            "Received {} bytes, decoded {} frames with {} targets, {} errors",
            stats.bytes_received,
            stats.frames_decoded,
            stats.records_emitted,
            stats.errors()
        );
        Ok(())
    }

    /// Feed one chunk and publish the resulting frames.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Vec<TargetMessage> {
        let outcomes = self.sync.feed(chunk);
        let format = self.sync.format().name().to_string();

        let mut messages = Vec::new();
        for outcome in &outcomes {
            log_outcome(outcome);
            if let Some(message) = TargetMessage::from_outcome(outcome, &format) {
                if self.output {
                    match serde_json::to_string(&message) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Cannot serialize frame: {}", e),
                    }
                }
                // No receivers just means no client is connected
                let _ = self.tx_targets.send(message.clone());
                messages.push(message);
            }
        }

        self.session.update_sync(self.sync.state(), self.sync.stats());
        messages
    }

    /// Report the bytes of an unfinished frame once the source has ended.
    pub fn finish(&mut self) -> Option<DecodeOutcome> {
        let outcome = self.sync.reset()?;
        log_outcome(&outcome);
        self.session.update_sync(self.sync.state(), self.sync.stats());
        Some(outcome)
    }
}

fn log_outcome(outcome: &DecodeOutcome) {
    match outcome {
        DecodeOutcome::Records { range, records } => {
            debug!("Frame at {}: {} targets", range.start, records.len());
            for r in records {
                trace!(
                    "  target {}: x={:?} y={:?} angle={:?} distance={:?} speed={:?} motion={:?}",
                    r.slot,
                    r.x,
                    r.y,
                    r.angle_deg,
                    r.distance_m,
                    r.speed,
                    r.motion()
                );
            }
        }
        DecodeOutcome::Empty { range } => {
            debug!("Frame at {}: no targets", range.start);
        }
        DecodeOutcome::Error {
            kind: ErrorKind::Skipped,
            range,
        } => {
            debug!(
                "Skipped {} bytes at {}",
                range.end - range.start,
                range.start
            );
        }
        DecodeOutcome::Error { kind, range } => {
            warn!(
                "{:?}: discarded bytes {}..{}",
                kind, range.start, range.end
            );
        }
    }
}

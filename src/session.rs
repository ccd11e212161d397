//! Per-connection session state machine
//!
//! The controller turns inbound messages into session state: handshake metadata,
//! decoded assets and timing samples. It is owned by a single task (see
//! [`Driver`](crate::driver::Driver)); readers only ever see immutable
//! [`SessionSnapshot`]s.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::codec::{CodecRegistry, DecodeStats, FrameCodec, decode_stats};
use crate::protocol::{SubFrames, decode_envelope};
use crate::stats::SampleStore;
use crate::types::{AssetMap, Envelope, Handshake, PerformanceReport, Ratio, Sample};
use crate::{BenchError, Result};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingHandshake,
    Active,
    Closed,
}

/// What the server told us about this session in its handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub player_id: u8,
    pub aspect_ratio: Ratio,
    pub bezel: Ratio,
    pub codec_version: String,
}

impl From<&Handshake> for SessionMetadata {
    fn from(handshake: &Handshake) -> Self {
        Self {
            player_id: handshake.confirmed_player_id,
            aspect_ratio: handshake.aspect_ratio,
            bezel: handshake.bezel,
            codec_version: handshake.codec_version_label.clone(),
        }
    }
}

/// Immutable view of a session at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub metadata: Option<SessionMetadata>,
    pub assets: Arc<AssetMap>,
    pub total_frames: usize,
    pub performance: PerformanceReport,
    pub decode: Option<DecodeStats>,
}

/// Effect of one ingested message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// Handshake accepted, session is now active
    Handshake,
    /// A game frame was appended; `total` counts all frames so far
    Frame { total: usize },
    /// Asset sub-frames were merged; `complete` is false if the bundle was cut
    /// short by a malformed sub-frame
    Assets { merged: usize, complete: bool },
    /// Message had no effect (unknown tag, repeated handshake)
    Ignored,
}

/// Owns the state of one connection.
#[derive(Debug)]
pub struct SessionController {
    state: SessionState,
    registry: Arc<CodecRegistry>,
    metadata: Option<SessionMetadata>,
    codec: Option<Arc<dyn FrameCodec>>,
    assets: Arc<AssetMap>,
    samples: SampleStore,
}

impl SessionController {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self {
            state: SessionState::AwaitingHandshake,
            registry,
            metadata: None,
            codec: None,
            assets: Arc::new(AssetMap::new()),
            samples: SampleStore::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn metadata(&self) -> Option<&SessionMetadata> {
        self.metadata.as_ref()
    }

    pub fn codec(&self) -> Option<&Arc<dyn FrameCodec>> {
        self.codec.as_ref()
    }

    pub fn assets(&self) -> &AssetMap {
        &self.assets
    }

    pub fn samples(&self) -> &SampleStore {
        &self.samples
    }

    pub fn total_frames(&self) -> usize {
        self.samples.len()
    }

    /// Feed one inbound message that arrived at `arrival_ms`.
    ///
    /// Protocol errors leave the session usable. A handshake naming an unknown
    /// codec closes the session and returns [`BenchError::CodecNotFound`].
    pub fn ingest(&mut self, message: &[u8], arrival_ms: u64) -> Result<Ingest> {
        if self.state == SessionState::Closed {
            return Err(BenchError::SessionClosed);
        }

        match decode_envelope(message)? {
            Envelope::Handshake(handshake) => self.on_handshake(handshake),
            Envelope::GameFrame(frame) => {
                self.samples.push(Sample::new(arrival_ms, frame));
                let total = self.samples.len();
                trace!(total, arrival_ms, bytes = frame.len(), "Game frame");
                Ok(Ingest::Frame { total })
            }
            Envelope::AssetBundle(bundle) => Ok(self.on_asset_bundle(bundle)),
            Envelope::Unknown { tag } => {
                warn!(tag, bytes = message.len(), "Ignoring message with unknown envelope tag");
                Ok(Ingest::Ignored)
            }
        }
    }

    fn on_handshake(&mut self, handshake: Handshake) -> Result<Ingest> {
        if self.state != SessionState::AwaitingHandshake {
            debug!(label = %handshake.codec_version_label, "Ignoring repeated handshake");
            return Ok(Ingest::Ignored);
        }

        let codec = match self.registry.lookup(&handshake.codec_version_label) {
            Ok(codec) => codec,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e);
            }
        };

        info!(
            player_id = handshake.confirmed_player_id,
            codec = %handshake.codec_version_label,
            aspect_x = handshake.aspect_ratio.x,
            aspect_y = handshake.aspect_ratio.y,
            "Handshake accepted"
        );
        self.metadata = Some(SessionMetadata::from(&handshake));
        self.codec = Some(codec);
        self.state = SessionState::Active;
        Ok(Ingest::Handshake)
    }

    fn on_asset_bundle(&mut self, bundle: &[u8]) -> Ingest {
        let assets = Arc::make_mut(&mut self.assets);
        let mut merged = 0;
        let mut complete = true;

        for subframe in SubFrames::new(bundle) {
            match subframe {
                Ok(subframe) => {
                    let record = subframe.to_record();
                    assets.insert(subframe.key, record);
                    merged += 1;
                }
                Err(e) => {
                    warn!(error = %e, merged, "Asset bundle cut short");
                    complete = false;
                }
            }
        }

        debug!(merged, total = assets.len(), "Merged asset bundle");
        Ingest::Assets { merged, complete }
    }

    /// Close the session. Idempotent.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!(frames = self.samples.len(), "Session closed");
            self.state = SessionState::Closed;
        }
    }

    /// Decode statistics for the most recent game frame, if a codec is selected.
    pub fn decode_stats(&self) -> Option<DecodeStats> {
        let codec = self.codec.as_ref()?;
        let last = self.samples.last()?;
        match decode_stats(codec.as_ref(), &last.payload) {
            Ok(stats) => Some(stats),
            Err(e) => {
                debug!(error = %e, "Could not decode latest frame");
                None
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            metadata: self.metadata.clone(),
            assets: Arc::clone(&self.assets),
            total_frames: self.samples.len(),
            performance: self.samples.report(),
            decode: self.decode_stats(),
        }
    }
}

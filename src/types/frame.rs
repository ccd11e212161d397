//! Frame types shared by the decoder, the session and the statistics engine

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Envelope tag of an asset bundle message.
pub const ASSET_BUNDLE_TAG: u8 = 1;
/// Envelope tag of a handshake message.
pub const HANDSHAKE_TAG: u8 = 2;
/// Envelope tag of a game frame message.
pub const GAME_FRAME_TAG: u8 = 3;

/// A pair of single-byte dimensions (aspect ratio, bezel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub x: u8,
    pub y: u8,
}

impl Ratio {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

/// Server handshake, received once per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Player id the server assigned to this client
    pub confirmed_player_id: u8,
    pub aspect_ratio: Ratio,
    pub bezel: Ratio,
    /// Codec version label, e.g. `"1005"`
    pub codec_version_label: String,
}

/// Outermost wrapper of an inbound message, borrowed from the message buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<'a> {
    Handshake(Handshake),
    /// Whole message, starting at the envelope tag
    AssetBundle(&'a [u8]),
    /// Whole message, starting at the envelope tag
    GameFrame(&'a [u8]),
    /// Unrecognized tag; the rest of the message has no defined layout
    Unknown { tag: u8 },
}

impl Envelope<'_> {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Handshake(_) => "handshake",
            Envelope::AssetBundle(_) => "asset_bundle",
            Envelope::GameFrame(_) => "game_frame",
            Envelope::Unknown { .. } => "unknown",
        }
    }
}

/// One received game frame and the moment it arrived.
///
/// Arrival times are milliseconds on a monotonic clock whose origin is the
/// start of the session.
#[derive(Debug, Clone)]
pub struct Sample {
    pub arrival_ms: u64,

    /// Raw game frame (zero-copy via Arc)
    pub payload: Arc<[u8]>,
}

impl Sample {
    pub fn new(arrival_ms: u64, payload: impl Into<Arc<[u8]>>) -> Self {
        Self { arrival_ms, payload: payload.into() }
    }

    /// A sample with an empty payload, for timing-only use.
    pub fn at(arrival_ms: u64) -> Self {
        Self::new(arrival_ms, Vec::new())
    }
}

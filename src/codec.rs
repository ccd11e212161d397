//! Frame codec lookup
//!
//! Game frames are compressed by a version-specific codec that the server
//! announces in its handshake. The harness only needs to select the codec and
//! measure how long decoding the most recent frame takes, so codecs are a small
//! capability trait looked up by exact version label.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::GAME_FRAME_TAG;
use crate::{BenchError, Result};

/// Codec versions the server is known to ship.
pub const KNOWN_CODEC_VERSIONS: [&str; 9] =
    ["0756", "0762", "0765", "0766", "0767", "1000", "1004", "1005", "1006"];

/// Bytes preceding a node's body: frame tag and three size bytes.
pub const NODE_HEADER_LEN: usize = 4;

/// Version label announced in the handshake, matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodecVersion(String);

impl CodecVersion {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CodecVersion {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A version-specific node codec.
pub trait FrameCodec: Send + Sync + fmt::Debug {
    fn version(&self) -> &CodecVersion;

    /// Decode one node, header included.
    fn decode(&self, node: &[u8]) -> Result<Vec<u8>>;

    /// Encode a node body into a complete node, header included.
    fn encode(&self, body: &[u8]) -> Result<Vec<u8>>;
}

/// Codec that stores node bodies unchanged.
///
/// Stands in for every known version; the real codecs live with the server.
#[derive(Debug, Clone)]
pub struct PassthroughCodec {
    version: CodecVersion,
}

impl PassthroughCodec {
    pub fn new(version: impl Into<CodecVersion>) -> Self {
        Self { version: version.into() }
    }
}

impl FrameCodec for PassthroughCodec {
    fn version(&self) -> &CodecVersion {
        &self.version
    }

    fn decode(&self, node: &[u8]) -> Result<Vec<u8>> {
        let size = node_size(node, 0)?;
        if size != node.len() {
            return Err(BenchError::protocol(
                "node decoding",
                format!("node declares {size} bytes but is {} long", node.len()),
            ));
        }
        Ok(node[NODE_HEADER_LEN..].to_vec())
    }

    fn encode(&self, body: &[u8]) -> Result<Vec<u8>> {
        crate::protocol::encode::encode_game_frame([body])
    }
}

/// Node count and decode time of one game frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeStats {
    pub total_nodes: usize,
    pub decode_time_ms: f64,
}

/// Size of the node starting at `offset`: the sum of its three size bytes.
fn node_size(frame: &[u8], offset: usize) -> Result<usize> {
    let header = frame.get(offset..offset + NODE_HEADER_LEN).ok_or_else(|| {
        BenchError::truncated(
            format!("game frame node header at {offset}"),
            NODE_HEADER_LEN,
            frame.len() - offset.min(frame.len()),
        )
    })?;
    Ok(header[1] as usize + header[2] as usize + header[3] as usize)
}

/// Split a game frame into its nodes, headers included.
///
/// A bare frame tag with nothing after it carries no nodes.
pub fn split_nodes(frame: &[u8]) -> Result<Vec<&[u8]>> {
    if frame == [GAME_FRAME_TAG] {
        return Ok(Vec::new());
    }

    let mut nodes = Vec::new();
    let mut offset = 0;
    while offset < frame.len() {
        let size = node_size(frame, offset)?;
        if size < NODE_HEADER_LEN {
            return Err(BenchError::protocol(
                format!("game frame node at {offset}"),
                format!("size {size} is smaller than the node header"),
            ));
        }
        let end = offset + size;
        if end > frame.len() {
            return Err(BenchError::truncated(
                format!("game frame node at {offset}"),
                size,
                frame.len() - offset,
            ));
        }
        nodes.push(&frame[offset..end]);
        offset = end;
    }
    Ok(nodes)
}

/// Decode every node of `frame` and time it.
pub fn decode_stats(codec: &dyn FrameCodec, frame: &[u8]) -> Result<DecodeStats> {
    let started = Instant::now();
    let nodes = split_nodes(frame)?;
    for node in &nodes {
        codec.decode(node)?;
    }
    let elapsed = started.elapsed();

    Ok(DecodeStats {
        total_nodes: nodes.len(),
        decode_time_ms: elapsed.as_secs_f64() * 1000.0,
    })
}

/// Version label to codec.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<CodecVersion, Arc<dyn FrameCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass-through codecs for every version in [`KNOWN_CODEC_VERSIONS`].
    pub fn known() -> Self {
        Self::with_versions(KNOWN_CODEC_VERSIONS)
    }

    /// Pass-through codecs for the given version labels.
    pub fn with_versions<I, V>(versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CodecVersion>,
    {
        let mut registry = Self::new();
        for version in versions {
            registry.register(Arc::new(PassthroughCodec::new(version)));
        }
        registry
    }

    /// Register a codec, replacing any codec with the same version.
    pub fn register(&mut self, codec: Arc<dyn FrameCodec>) {
        debug!(version = %codec.version(), "Registered frame codec");
        self.codecs.insert(codec.version().clone(), codec);
    }

    /// Look up a codec by exact version label.
    pub fn lookup(&self, label: &str) -> Result<Arc<dyn FrameCodec>> {
        self.codecs
            .get(&CodecVersion::new(label))
            .cloned()
            .ok_or_else(|| BenchError::CodecNotFound { version: label.to_string() })
    }

    pub fn versions(&self) -> impl Iterator<Item = &CodecVersion> {
        self.codecs.keys()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

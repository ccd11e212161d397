//! Message builders, the inverse of the decoders.
//!
//! The harness itself only consumes these messages; the builders back the replay
//! provider, tests, benches and stand-in servers.

use super::assets::{KEY_LEN, LENGTH_DIGITS, SUBFRAME_HEADER_LEN};
use crate::types::{ASSET_BUNDLE_TAG, AssetClass, GAME_FRAME_TAG, HANDSHAKE_TAG, Handshake};
use crate::{BenchError, Result};

/// Largest length expressible in ten base-36 digits.
const MAX_DECLARED_LEN: u64 = 36u64.pow(LENGTH_DIGITS as u32) - 1;

/// Encode a handshake message.
pub fn encode_handshake(handshake: &Handshake) -> Result<Vec<u8>> {
    let label = &handshake.codec_version_label;
    if !label.is_ascii() || label.len() > u8::MAX as usize {
        return Err(BenchError::protocol(
            "handshake encoding",
            format!("codec label {label:?} must be ASCII and at most 255 bytes"),
        ));
    }

    let mut buf = Vec::with_capacity(7 + label.len());
    buf.extend_from_slice(&[
        HANDSHAKE_TAG,
        handshake.confirmed_player_id,
        handshake.aspect_ratio.x,
        handshake.aspect_ratio.y,
        handshake.bezel.x,
        handshake.bezel.y,
        label.len() as u8,
    ]);
    buf.extend_from_slice(label.as_bytes());
    Ok(buf)
}

/// Encode one asset sub-frame. Concatenate several to form a bundle.
pub fn encode_asset_subframe(class: AssetClass, key: &str, payload: &[u8]) -> Result<Vec<u8>> {
    if key.len() > KEY_LEN || key.bytes().any(|b| b == 0) {
        return Err(BenchError::protocol(
            "asset encoding",
            format!("key {key:?} must be at most {KEY_LEN} bytes without NULs"),
        ));
    }

    let declared_len = KEY_LEN + payload.len();
    if declared_len as u64 > MAX_DECLARED_LEN {
        return Err(BenchError::protocol("asset encoding", "payload too large"));
    }

    let mut buf = Vec::with_capacity(SUBFRAME_HEADER_LEN + declared_len);
    buf.push(ASSET_BUNDLE_TAG);
    buf.push(class.tag());
    buf.extend_from_slice(&to_base36(declared_len as u64));
    buf.extend_from_slice(key.as_bytes());
    buf.resize(SUBFRAME_HEADER_LEN + KEY_LEN, 0);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encode a bundle from `(class, key, payload)` entries.
pub fn encode_asset_bundle<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (AssetClass, &'a str, &'a [u8])>,
{
    let mut buf = Vec::new();
    for (class, key, payload) in entries {
        buf.extend(encode_asset_subframe(class, key, payload)?);
    }
    Ok(buf)
}

/// Encode a game frame made of codec nodes.
///
/// Each node is prefixed with the frame tag and a size whose three bytes sum to
/// the node's total length (prefix included), which is how the server frames them.
pub fn encode_game_frame<'a, I>(nodes: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut buf = Vec::new();
    for node in nodes {
        let total = node.len() + 4;
        if total > 3 * u8::MAX as usize {
            return Err(BenchError::protocol("game frame encoding", "node too large"));
        }
        let a = total.min(u8::MAX as usize);
        let b = (total - a).min(u8::MAX as usize);
        let c = total - a - b;
        buf.extend_from_slice(&[GAME_FRAME_TAG, a as u8, b as u8, c as u8]);
        buf.extend_from_slice(node);
    }
    if buf.is_empty() {
        buf.push(GAME_FRAME_TAG);
    }
    Ok(buf)
}

fn to_base36(mut value: u64) -> [u8; LENGTH_DIGITS] {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = [b'0'; LENGTH_DIGITS];
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    out
}

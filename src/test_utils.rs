//! Test utilities for building server messages and scripted sessions
//!
//! Shared by unit tests and the benches.

#![cfg(any(test, feature = "benchmark"))]

use std::time::Duration;

use crate::protocol::encode::{encode_asset_bundle, encode_game_frame, encode_handshake};
use crate::providers::ReplayProvider;
use crate::types::{AssetClass, Handshake, Ratio, Sample};

/// A 16:9 handshake for player 7 announcing `label`.
pub fn handshake_message(label: &str) -> Vec<u8> {
    let handshake = Handshake {
        confirmed_player_id: 7,
        aspect_ratio: Ratio::new(16, 9),
        bezel: Ratio::new(0, 0),
        codec_version_label: label.to_string(),
    };
    encode_handshake(&handshake).unwrap_or_default()
}

/// A game frame holding `nodes` nodes of `node_len` bytes each.
pub fn game_frame(nodes: usize, node_len: usize) -> Vec<u8> {
    let node = vec![0xA5u8; node_len];
    encode_game_frame(std::iter::repeat_n(node.as_slice(), nodes)).unwrap_or_default()
}

/// A bundle with `count` entries per class, each carrying `payload_len` bytes.
pub fn asset_bundle(count: usize, payload_len: usize) -> Vec<u8> {
    let payload = vec![0x5Au8; payload_len];
    let keys: Vec<(AssetClass, String)> = [AssetClass::Image, AssetClass::Audio, AssetClass::Font]
        .into_iter()
        .flat_map(|class| (0..count).map(move |i| (class, format!("{}{i}", class.as_str()))))
        .collect();
    encode_asset_bundle(keys.iter().map(|(class, key)| (*class, key.as_str(), payload.as_slice())))
        .unwrap_or_default()
}

/// Samples arriving every `interval_ms`, starting at zero.
pub fn steady_samples(count: usize, interval_ms: u64) -> Vec<Sample> {
    (0..count as u64).map(|i| Sample::at(i * interval_ms)).collect()
}

/// Handshake, then `frames` single-node game frames one `interval` apart.
///
/// The handshake and the first frame are both delivered at the start.
pub fn paced_session(label: &str, frames: usize, interval: Duration) -> ReplayProvider {
    let mut replay = ReplayProvider::new(format!("paced-{label}"))
        .push(Duration::ZERO, handshake_message(label));
    for i in 0..frames {
        replay = replay.push(interval * i as u32, game_frame(1, 16));
    }
    replay
}

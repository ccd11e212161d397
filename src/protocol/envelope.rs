//! Envelope and handshake decoding

use crate::types::{
    ASSET_BUNDLE_TAG, Envelope, GAME_FRAME_TAG, HANDSHAKE_TAG, Handshake, Ratio,
};
use crate::{BenchError, Result};

/// Offset of the codec label length byte in a handshake.
const LABEL_LEN_OFFSET: usize = 6;
/// Offset of the first codec label byte in a handshake.
const LABEL_OFFSET: usize = 7;

/// Decode the envelope of one inbound message.
///
/// Unrecognized tags are reported as [`Envelope::Unknown`] rather than raised;
/// the caller must not interpret the remaining bytes.
pub fn decode_envelope(buf: &[u8]) -> Result<Envelope<'_>> {
    let Some(&tag) = buf.first() else {
        return Err(BenchError::protocol("envelope", "empty message"));
    };

    match tag {
        ASSET_BUNDLE_TAG => Ok(Envelope::AssetBundle(buf)),
        HANDSHAKE_TAG => decode_handshake(buf).map(Envelope::Handshake),
        GAME_FRAME_TAG => Ok(Envelope::GameFrame(buf)),
        tag => Ok(Envelope::Unknown { tag }),
    }
}

/// Decode a handshake message, tag byte included.
///
/// Never reads past the end of the declared codec label.
pub fn decode_handshake(buf: &[u8]) -> Result<Handshake> {
    if buf.len() < LABEL_OFFSET {
        return Err(BenchError::truncated("handshake header", LABEL_OFFSET, buf.len()));
    }
    if buf[0] != HANDSHAKE_TAG {
        return Err(BenchError::protocol(
            "handshake",
            format!("expected tag {HANDSHAKE_TAG}, found {}", buf[0]),
        ));
    }

    let label_len = buf[LABEL_LEN_OFFSET] as usize;
    let label_end = LABEL_OFFSET + label_len;
    let label = buf
        .get(LABEL_OFFSET..label_end)
        .ok_or_else(|| BenchError::truncated("handshake codec label", label_end, buf.len()))?;

    Ok(Handshake {
        confirmed_player_id: buf[1],
        aspect_ratio: Ratio::new(buf[2], buf[3]),
        bezel: Ratio::new(buf[4], buf[5]),
        // Labels are single-byte characters
        codec_version_label: label.iter().map(|&b| char::from(b)).collect(),
    })
}

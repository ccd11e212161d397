//! Asset bundle decoding
//!
//! A bundle is a run of length-prefixed sub-frames. Each sub-frame repeats the
//! envelope tag and is laid out as:
//!
//! ```text
//! [0]        envelope tag (1)
//! [1]        asset class (1 image, 2 audio, 3 font)
//! [2..12]    declared length L, 10 base-36 ASCII digits
//! [12..44]   key, NUL padded
//! [44..12+L] payload
//! ```
//!
//! `L` counts the key and the payload, so a sub-frame occupies `12 + L` bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::types::{ASSET_BUNDLE_TAG, AssetClass, AssetMap, AssetRecord};
use crate::{BenchError, Result};

/// Bytes before the key: envelope tag, class tag, length digits.
pub const SUBFRAME_HEADER_LEN: usize = 12;
/// Number of base-36 digits in the declared length.
pub const LENGTH_DIGITS: usize = 10;
/// Fixed key width.
pub const KEY_LEN: usize = 32;

const IMAGE_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// One complete sub-frame, borrowed from the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFrame<'a> {
    /// Offset of the sub-frame's envelope tag within the bundle
    pub offset: usize,
    pub class: AssetClass,
    /// Key with NUL bytes removed
    pub key: String,
    /// Declared length (key + payload)
    pub declared_len: usize,
    pub payload: &'a [u8],
}

impl SubFrame<'_> {
    /// Bytes this sub-frame occupies on the wire.
    pub fn wire_len(&self) -> usize {
        SUBFRAME_HEADER_LEN + self.declared_len
    }

    /// Build the asset record for this sub-frame.
    pub fn to_record(&self) -> AssetRecord {
        match self.class {
            AssetClass::Image => AssetRecord::Image {
                data: format!("{IMAGE_URI_PREFIX}{}", STANDARD.encode(self.payload)),
            },
            AssetClass::Audio => AssetRecord::Audio { data: self.payload.to_vec(), decoded: false },
            AssetClass::Font => {
                AssetRecord::Font { byte_length: self.payload.len(), name: self.key.clone() }
            }
        }
    }
}

/// Iterator over the sub-frames of a bundle.
///
/// Yields every complete sub-frame, then at most one error, then stops. A
/// malformed sub-frame leaves no safe place to resume, so nothing after it is
/// read.
#[derive(Debug, Clone)]
pub struct SubFrames<'a> {
    buf: &'a [u8],
    cursor: usize,
    failed: bool,
}

impl<'a> SubFrames<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0, failed: false }
    }

    fn read_subframe(&self, offset: usize) -> Result<SubFrame<'a>> {
        let buf = self.buf;
        let remaining = buf.len() - offset;
        if remaining < SUBFRAME_HEADER_LEN + KEY_LEN {
            return Err(BenchError::truncated(
                format!("asset sub-frame header at {offset}"),
                SUBFRAME_HEADER_LEN + KEY_LEN,
                remaining,
            ));
        }

        if buf[offset] != ASSET_BUNDLE_TAG {
            return Err(BenchError::UnknownEnvelope { tag: buf[offset] });
        }

        let class_tag = buf[offset + 1];
        let class = AssetClass::from_tag(class_tag)
            .ok_or(BenchError::UnknownAssetClass { tag: class_tag, offset })?;

        let digits = &buf[offset + 2..offset + SUBFRAME_HEADER_LEN];
        let declared_len = parse_base36(digits).ok_or_else(|| {
            BenchError::protocol(
                format!("asset sub-frame at {offset}"),
                format!("invalid length digits {:?}", String::from_utf8_lossy(digits)),
            )
        })?;

        if declared_len < KEY_LEN {
            return Err(BenchError::protocol(
                format!("asset sub-frame at {offset}"),
                format!("declared length {declared_len} shorter than key"),
            ));
        }

        let wire_len = SUBFRAME_HEADER_LEN + declared_len;
        if wire_len > remaining {
            return Err(BenchError::truncated(
                format!("asset sub-frame at {offset}"),
                wire_len,
                remaining,
            ));
        }

        let key_start = offset + SUBFRAME_HEADER_LEN;
        let payload_start = key_start + KEY_LEN;
        let key = buf[key_start..payload_start]
            .iter()
            .filter(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect();

        Ok(SubFrame {
            offset,
            class,
            key,
            declared_len,
            payload: &buf[payload_start..offset + wire_len],
        })
    }
}

impl<'a> Iterator for SubFrames<'a> {
    type Item = Result<SubFrame<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.buf.len() {
            return None;
        }

        match self.read_subframe(self.cursor) {
            Ok(subframe) => {
                self.cursor += subframe.wire_len();
                Some(Ok(subframe))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for SubFrames<'_> {}

/// Decode a whole bundle; any malformed sub-frame fails the bundle.
pub fn decode_asset_bundle(buf: &[u8]) -> Result<AssetMap> {
    let mut assets = AssetMap::new();
    for subframe in SubFrames::new(buf) {
        let subframe = subframe?;
        let record = subframe.to_record();
        assets.insert(subframe.key, record);
    }
    Ok(assets)
}

/// Parse fixed-width base-36 digits. Surrounding spaces and NULs are ignored.
pub(crate) fn parse_base36(digits: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(digits).ok()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
    if text.is_empty() {
        return None;
    }
    usize::from_str_radix(text, 36).ok()
}

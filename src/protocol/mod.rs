//! Wire protocol decoding.
//!
//! Every inbound message starts with an envelope tag:
//!
//! | tag | message      | decoder                          |
//! |-----|--------------|----------------------------------|
//! | 1   | asset bundle | [`decode_asset_bundle`], [`SubFrames`] |
//! | 2   | handshake    | [`decode_handshake`]             |
//! | 3   | game frame   | kept raw as a [`Sample`](crate::types::Sample) |
//!
//! Decoding is synchronous and pure: no function here allocates more than the
//! values it returns, and none of them keeps state between calls.
//!
//! ```rust
//! use framebench::protocol::{decode_envelope, encode};
//! use framebench::types::{AssetClass, Envelope};
//!
//! let bundle = encode::encode_asset_subframe(AssetClass::Font, "font1", &[])?;
//! match decode_envelope(&bundle)? {
//!     Envelope::AssetBundle(bytes) => {
//!         let assets = framebench::protocol::decode_asset_bundle(bytes)?;
//!         assert!(assets.get(AssetClass::Font, "font1").is_some());
//!     }
//!     other => panic!("unexpected {}", other.kind()),
//! }
//! # Ok::<(), framebench::BenchError>(())
//! ```

mod assets;
pub mod encode;
mod envelope;

pub use assets::{KEY_LEN, SUBFRAME_HEADER_LEN, SubFrame, SubFrames, decode_asset_bundle};
pub use envelope::{decode_envelope, decode_handshake};

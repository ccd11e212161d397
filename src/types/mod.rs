//! Core types shared across the harness.
//!
//! All three layers of the harness agree on these representations:
//! - [`Envelope`] and [`Handshake`] are what the wire decoder produces
//! - [`AssetMap`] holds decoded asset records, class → key → record
//! - [`Sample`] is the one in-memory frame representation; the session appends
//!   them and the statistics engine reads them
//! - [`PerformanceAggregate`] / [`PerformanceReport`] are derived from samples and
//!   are exactly what scenario assertions consume
//!
//! ```rust
//! use framebench::types::{AssetClass, AssetMap, AssetRecord};
//!
//! let mut assets = AssetMap::new();
//! assets.insert("logo", AssetRecord::Font { byte_length: 0, name: "logo".into() });
//! assets.insert("logo", AssetRecord::Image { data: "data:image/jpeg;base64,".into() });
//!
//! // Same key, different classes: both survive.
//! assert_eq!(assets.len(), 2);
//! assert!(assets.get(AssetClass::Font, "logo").is_some());
//! ```

mod asset;
mod frame;
mod performance;

pub use asset::{AssetClass, AssetMap, AssetRecord};
pub use frame::{
    ASSET_BUNDLE_TAG, Envelope, GAME_FRAME_TAG, HANDSHAKE_TAG, Handshake, Ratio, Sample,
};
pub use performance::{PerformanceAggregate, PerformanceReport};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = AssetRecord> {
        prop_oneof![
            "[A-Za-z0-9+/]{0,24}".prop_map(|b64| AssetRecord::Image {
                data: format!("data:image/jpeg;base64,{b64}")
            }),
            prop::collection::vec(any::<u8>(), 0..32)
                .prop_map(|data| AssetRecord::Audio { data, decoded: false }),
            ("[a-z]{1,8}", 0usize..4096)
                .prop_map(|(name, byte_length)| AssetRecord::Font { byte_length, name }),
        ]
    }

    proptest! {
        #[test]
        fn prop_keys_are_unique_per_class(
            entries in prop::collection::vec(("[a-c]", arb_record()), 0..40)
        ) {
            let mut assets = AssetMap::new();
            let mut expected = std::collections::BTreeMap::new();
            for (key, record) in &entries {
                assets.insert(key.clone(), record.clone());
                expected.insert((record.class(), key.clone()), record.clone());
            }

            prop_assert_eq!(assets.len(), expected.len());
            for ((class, key), record) in &expected {
                prop_assert_eq!(assets.get(*class, key), Some(record));
            }
        }

        #[test]
        fn prop_asset_map_json_roundtrip(
            entries in prop::collection::vec(("[a-z]{1,6}", arb_record()), 0..10)
        ) {
            let mut assets = AssetMap::new();
            for (key, record) in entries {
                assets.insert(key, record);
            }
            let json = serde_json::to_string(&assets).unwrap();
            let back: AssetMap = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, assets);
        }
    }

    #[test]
    fn asset_class_tags_roundtrip() {
        for class in [AssetClass::Image, AssetClass::Audio, AssetClass::Font] {
            assert_eq!(AssetClass::from_tag(class.tag()), Some(class));
        }
        assert_eq!(AssetClass::from_tag(0), None);
        assert_eq!(AssetClass::from_tag(4), None);
    }

    #[test]
    fn insert_replaces_existing_entries() {
        let mut assets = AssetMap::new();
        assets.insert("a", AssetRecord::Font { byte_length: 1, name: "a".into() });
        assets.insert("b", AssetRecord::Font { byte_length: 2, name: "b".into() });

        let previous = assets.insert("a", AssetRecord::Font { byte_length: 10, name: "a".into() });
        assert_eq!(previous, Some(AssetRecord::Font { byte_length: 1, name: "a".into() }));
        assert_eq!(
            assets.get(AssetClass::Font, "a"),
            Some(&AssetRecord::Font { byte_length: 10, name: "a".into() })
        );
        assert_eq!(assets.counts().get(&AssetClass::Font), Some(&2));
    }

    #[test]
    fn font_record_serializes_like_the_server_reports() {
        let mut assets = AssetMap::new();
        assets.insert("font1", AssetRecord::Font { byte_length: 0, name: "font1".into() });
        let json = serde_json::to_value(&assets).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fonts": {"font1": {"type": "font", "byteLength": 0, "name": "font1"}}
            })
        );
    }

    #[test]
    fn envelope_kind_names() {
        assert_eq!(Envelope::GameFrame(&[3]).kind(), "game_frame");
        assert_eq!(Envelope::Unknown { tag: 9 }.kind(), "unknown");
    }
}

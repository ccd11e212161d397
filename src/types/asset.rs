//! Asset records and the class → key → record mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Asset class carried in byte 1 of every asset sub-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    #[serde(rename = "images")]
    Image,
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "fonts")]
    Font,
}

impl AssetClass {
    /// Map a wire tag to a class.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(AssetClass::Image),
            2 => Some(AssetClass::Audio),
            3 => Some(AssetClass::Font),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            AssetClass::Image => 1,
            AssetClass::Audio => 2,
            AssetClass::Font => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Image => "images",
            AssetClass::Audio => "audio",
            AssetClass::Font => "fonts",
        }
    }
}

/// One decoded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetRecord {
    /// JPEG image as a `data:` URI
    Image { data: String },
    /// Raw audio; decoding is left to an external codec
    Audio { data: Vec<u8>, decoded: bool },
    /// Font metadata only, the font itself is not parsed
    Font {
        #[serde(rename = "byteLength")]
        byte_length: usize,
        name: String,
    },
}

impl AssetRecord {
    pub fn class(&self) -> AssetClass {
        match self {
            AssetRecord::Image { .. } => AssetClass::Image,
            AssetRecord::Audio { .. } => AssetClass::Audio,
            AssetRecord::Font { .. } => AssetClass::Font,
        }
    }
}

/// Decoded assets, keyed first by class and then by key.
///
/// Classes are independent namespaces: an image and a font may share a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetMap {
    classes: BTreeMap<AssetClass, BTreeMap<String, AssetRecord>>,
}

impl AssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any previous record with the same class and key.
    pub fn insert(&mut self, key: impl Into<String>, record: AssetRecord) -> Option<AssetRecord> {
        self.classes.entry(record.class()).or_default().insert(key.into(), record)
    }

    pub fn get(&self, class: AssetClass, key: &str) -> Option<&AssetRecord> {
        self.classes.get(&class)?.get(key)
    }

    /// Number of records per non-empty class.
    pub fn counts(&self) -> BTreeMap<AssetClass, usize> {
        self.classes
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(class, records)| (*class, records.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.classes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

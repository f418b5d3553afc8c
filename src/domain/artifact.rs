//! Artifacts produced by external extractors.
//!
//! The engine never reads PDF or DOCX bytes itself; it consumes these
//! already-extracted values through the adapter traits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat file metadata (tag name -> value)
pub type Metadata = BTreeMap<String, String>;

/// An image extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// File name assigned by the extractor
    pub name: String,

    /// 1-indexed page the image was found on
    pub page: u32,

    /// 64-bit perceptual hash, if the extractor computed one
    #[serde(default, with = "hash_hex", skip_serializing_if = "Option::is_none")]
    pub hash: Option<u64>,
}

impl ExtractedImage {
    pub fn new(name: impl Into<String>, page: u32, hash: Option<u64>) -> Self {
        Self {
            name: name.into(),
            page,
            hash,
        }
    }

    pub fn is_on_first_page(&self) -> bool {
        self.page == 1
    }
}

/// Structured bibliographic data from the secondary extraction pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographicRecord {
    pub doi: Option<String>,
    pub title: Option<String>,
    pub journal_title: Option<String>,
}

impl BibliographicRecord {
    pub fn is_empty(&self) -> bool {
        self.doi.is_none() && self.title.is_none() && self.journal_title.is_none()
    }
}

/// Perceptual hashes travel as 16 hex digits, the way image-hashing tools print them
pub mod hash_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<u64, std::num::ParseIntError> {
        u64::from_str_radix(raw.trim().trim_start_matches("0x"), 16)
    }

    pub fn serialize<S>(hash: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match hash {
            Some(h) => serializer.serialize_str(&format!("{:016x}", h)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

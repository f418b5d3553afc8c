//! Publisher logo catalogue and perceptual-hash matching.
//!
//! The catalogue is a YAML (or JSON) list of logos, each with a reference
//! 64-bit perceptual hash and the manuscript versions the logo can appear
//! on:
//!
//! ```yaml
//! - name: elsevier_tree
//!   publisher: Elsevier
//!   hash: "c3c3e1f0f8783c1e"
//!   versions: [proof, record_open_access, record_paywalled]
//! ```
//!
//! The catalogue is read-only once loaded, so one instance can be shared by
//! concurrent evaluations.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::artifact::hash_hex;
use crate::domain::{ExtractedImage, Version};

/// Default maximum Hamming distance for a logo match
pub const DEFAULT_MAX_HASH_DISTANCE: u32 = 5;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Failed to read logo catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse logo catalogue {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Logo '{name}' has no reference hash")]
    MissingHash { name: String },
}

/// A reference logo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, with = "hash_hex")]
    pub hash: Option<u64>,

    /// Versions this logo is consistent with
    pub versions: BTreeSet<Version>,
}

/// A catalogue logo found among the extracted images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLogo {
    pub name: String,
    pub image: String,
    pub distance: u32,
    pub versions: BTreeSet<Version>,
}

/// Number of differing bits between two perceptual hashes
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[derive(Debug, Clone, Default)]
pub struct LogoCatalogue {
    entries: Vec<LogoEntry>,
}

impl LogoCatalogue {
    pub fn new(entries: Vec<LogoEntry>) -> Result<Self, CatalogueError> {
        if let Some(entry) = entries.iter().find(|e| e.hash.is_none()) {
            return Err(CatalogueError::MissingHash {
                name: entry.name.clone(),
            });
        }
        Ok(Self { entries })
    }

    /// Load a catalogue from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self, CatalogueError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            CatalogueError::Parse { source, .. } => CatalogueError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, CatalogueError> {
        let entries: Vec<LogoEntry> =
            serde_yaml::from_str(content).map_err(|source| CatalogueError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[LogoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare every hashed image against every logo.
    ///
    /// Returns one `DetectedLogo` per (image, logo) pair within
    /// `max_distance` bits (inclusive).
    pub fn detect(&self, images: &[ExtractedImage], max_distance: u32) -> Vec<DetectedLogo> {
        let mut detected = Vec::new();

        for image in images {
            let Some(image_hash) = image.hash else {
                debug!(image = %image.name, "Image has no perceptual hash, skipping");
                continue;
            };

            for entry in &self.entries {
                let Some(logo_hash) = entry.hash else { continue };
                let distance = hamming_distance(image_hash, logo_hash);
                debug!(image = %image.name, logo = %entry.name, distance, "Compared image to logo");
                if distance <= max_distance {
                    detected.push(DetectedLogo {
                        name: entry.name.clone(),
                        image: image.name.clone(),
                        distance,
                        versions: entry.versions.clone(),
                    });
                }
            }
        }

        detected
    }
}

/// Union of the versions all detected logos are consistent with
pub fn corroborated_versions(detected: &[DetectedLogo]) -> BTreeSet<Version> {
    detected
        .iter()
        .flat_map(|d| d.versions.iter().copied())
        .collect()
}

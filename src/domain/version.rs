//! Manuscript versions and the per-document candidate space.
//!
//! A `VersionSpace` starts with a workflow-specific set of possible
//! versions and display weights, and is narrowed as evidence accumulates.
//! Excluding a version always zeroes its weight in the same step, so the
//! confidence report can never show weight for a version the engine has
//! ruled out.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Revision stage of a manuscript file.
///
/// Serialized as its display code (`SMUR`, `AM`, `P`, `VOR_oa`, `VOR_pw`);
/// catalogues may also spell it in snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Version {
    /// Submitted manuscript under review
    #[serde(rename = "SMUR", alias = "smur", alias = "submitted")]
    Submitted,
    /// Accepted manuscript (post peer review, author-produced)
    #[serde(rename = "AM", alias = "am", alias = "accepted")]
    Accepted,
    /// Publisher-typeset proof
    #[serde(rename = "P", alias = "p", alias = "proof")]
    Proof,
    /// Version of record, open access
    #[serde(rename = "VOR_oa", alias = "vor_oa", alias = "record_open_access")]
    RecordOpenAccess,
    /// Version of record, behind a paywall
    #[serde(rename = "VOR_pw", alias = "vor_pw", alias = "record_paywalled")]
    RecordPaywalled,
}

impl Version {
    pub const ALL: [Version; 5] = [
        Version::Submitted,
        Version::Accepted,
        Version::Proof,
        Version::RecordOpenAccess,
        Version::RecordPaywalled,
    ];

    /// Author-produced manuscripts
    pub const AUTHOR_MANUSCRIPTS: [Version; 2] = [Version::Submitted, Version::Accepted];

    /// Publisher-produced versions
    pub const PUBLISHER_VERSIONS: [Version; 3] = [
        Version::Proof,
        Version::RecordOpenAccess,
        Version::RecordPaywalled,
    ];

    /// Short code used in the confidence report
    pub fn code(&self) -> &'static str {
        match self {
            Version::Submitted => "SMUR",
            Version::Accepted => "AM",
            Version::Proof => "P",
            Version::RecordOpenAccess => "VOR_oa",
            Version::RecordPaywalled => "VOR_pw",
        }
    }

    pub fn is_author_manuscript(&self) -> bool {
        matches!(self, Version::Submitted | Version::Accepted)
    }

    pub fn is_version_of_record(&self) -> bool {
        matches!(self, Version::RecordOpenAccess | Version::RecordPaywalled)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Version::Submitted => "submitted version",
            Version::Accepted => "accepted version",
            Version::Proof => "proof",
            Version::RecordOpenAccess => "version of record (open access)",
            Version::RecordPaywalled => "version of record (paywalled)",
        };
        f.write_str(label)
    }
}

/// Version claimed by the depositor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredVersion {
    Submitted,
    Accepted,
    Proof,
    VersionOfRecord,
    /// Free text we could not map to a known version
    Unrecognised(String),
}

impl DeclaredVersion {
    /// Parse a declared version (case-insensitive, surrounding whitespace ignored)
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "submitted version"
            | "submitted manuscript"
            | "submitted manuscript under review"
            | "smur"
            | "submitted" => DeclaredVersion::Submitted,
            "accepted version" | "accepted manuscript" | "am" | "accepted" => {
                DeclaredVersion::Accepted
            }
            "proof" | "p" => DeclaredVersion::Proof,
            "version of record" | "published version" | "vor" | "published" => {
                DeclaredVersion::VersionOfRecord
            }
            _ => DeclaredVersion::Unrecognised(raw.trim().to_string()),
        }
    }

    /// Versions this declaration is consistent with
    pub fn versions(&self) -> &'static [Version] {
        match self {
            DeclaredVersion::Submitted => &[Version::Submitted],
            DeclaredVersion::Accepted => &[Version::Accepted],
            DeclaredVersion::Proof => &[Version::Proof],
            DeclaredVersion::VersionOfRecord => {
                &[Version::RecordOpenAccess, Version::RecordPaywalled]
            }
            DeclaredVersion::Unrecognised(_) => &[],
        }
    }

    pub fn is_author_manuscript(&self) -> bool {
        matches!(self, DeclaredVersion::Submitted | DeclaredVersion::Accepted)
    }
}

impl fmt::Display for DeclaredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredVersion::Submitted => f.write_str("submitted version"),
            DeclaredVersion::Accepted => f.write_str("accepted version"),
            DeclaredVersion::Proof => f.write_str("proof"),
            DeclaredVersion::VersionOfRecord => f.write_str("version of record"),
            DeclaredVersion::Unrecognised(raw) => f.write_str(raw),
        }
    }
}

/// Candidate versions plus informational display weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpace {
    possible: BTreeSet<Version>,
    weights: BTreeMap<Version, u32>,
}

impl VersionSpace {
    /// Build a space from explicit weights; every listed version starts possible
    pub fn with_weights(weights: [(Version, u32); 5]) -> Self {
        Self {
            possible: weights.iter().map(|(v, _)| *v).collect(),
            weights: weights.into_iter().collect(),
        }
    }

    /// Starting space for editable documents.
    ///
    /// Word-processor files are never proofs or records, so those are
    /// pre-excluded.
    pub fn editable() -> Self {
        let mut space = Self::with_weights([
            (Version::Submitted, 5000),
            (Version::Accepted, 5000),
            (Version::Proof, 0),
            (Version::RecordOpenAccess, 0),
            (Version::RecordPaywalled, 0),
        ]);
        space.exclude(&Version::PUBLISHER_VERSIONS);
        space
    }

    /// Starting space for fixed-layout documents
    pub fn fixed_layout() -> Self {
        Self::with_weights([
            (Version::Submitted, 2500),
            (Version::Accepted, 2500),
            (Version::Proof, 2500),
            (Version::RecordOpenAccess, 1250),
            (Version::RecordPaywalled, 1250),
        ])
    }

    /// Remove versions from the candidate set and zero their weights.
    ///
    /// Idempotent: excluding an already-excluded version is a no-op.
    pub fn exclude(&mut self, versions: &[Version]) {
        for version in versions {
            self.possible.remove(version);
            self.weights.insert(*version, 0);
        }
    }

    /// Exclude every possible version that is not in `corroborated`
    pub fn retain_corroborated(&mut self, corroborated: &BTreeSet<Version>) {
        let uncorroborated: Vec<Version> = self
            .possible
            .iter()
            .filter(|v| !corroborated.contains(v))
            .copied()
            .collect();
        self.exclude(&uncorroborated);
    }

    pub fn is_possible(&self, version: Version) -> bool {
        self.possible.contains(&version)
    }

    /// Whether any of the given versions is still possible
    pub fn any_possible(&self, versions: &[Version]) -> bool {
        versions.iter().any(|v| self.is_possible(*v))
    }

    /// Possible versions in canonical order
    pub fn possible(&self) -> Vec<Version> {
        self.possible.iter().copied().collect()
    }

    pub fn weight(&self, version: Version) -> u32 {
        self.weights.get(&version).copied().unwrap_or(0)
    }

    /// Display confidence per version code (weight / 100), plus aggregate `VOR`
    pub fn confidence_report(&self) -> BTreeMap<String, f64> {
        let mut report: BTreeMap<String, f64> = Version::ALL
            .iter()
            .map(|v| (v.code().to_string(), f64::from(self.weight(*v)) / 100.0))
            .collect();

        let record = self.weight(Version::RecordOpenAccess) + self.weight(Version::RecordPaywalled);
        report.insert("VOR".to_string(), f64::from(record) / 100.0);
        report
    }
}

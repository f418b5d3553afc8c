//! msversion - Manuscript version detection for repository deposits
//!
//! Decides which revision stage a manuscript file is (submitted, accepted,
//! proof or version of record) and whether it can be deposited without
//! human moderation.
//!
//! # Architecture
//!
//! The system is built around evidence accumulation:
//! - Independent tri-state tests run over already-extracted artifacts
//! - Results accumulate in a per-document evidence record
//! - A decision step turns the evidence into an approve/reject verdict
//!   with a human-readable reason
//!
//! # Modules
//!
//! - `adapters`: External collaborators (artifact sidecars, CERMINE, DOI resolver)
//! - `core`: Heuristics, workflows, the `Detector` and the audit log
//! - `domain`: Data structures (Version, Document, EvidenceRecord)
//! - `evidence`: Matching primitives and reference catalogues
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Evaluate a PDF against its declared metadata
//! msversion detect paper.pdf --title "Effects of drought on fern spores" \
//!     --version "accepted manuscript" --doi 10.1000/xyz
//!
//! # Evaluate a batch and keep an audit trail
//! msversion detect 'inbox/*.pdf' --audit-log
//! msversion history --limit 20
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod evidence;

// Re-export main types at crate root for convenience
pub use crate::core::{DetectError, Detector};
pub use domain::{
    Declaration, DetectionResult, Document, DocumentCategory, TestName, TriState, Version,
};
pub use evidence::{FuzzyMatcher, LogoCatalogue, MatchResult};

//! Domain types for manuscript version detection.
//!
//! This module contains the core data structures:
//! - Version: version labels, declared versions and the candidate space
//! - Document: files under evaluation and the category router
//! - Artifact: values produced by external extractors
//! - Record: per-document evidence and the finalized result

pub mod artifact;
pub mod document;
pub mod record;
pub mod version;

// Re-export commonly used types
pub use artifact::{BibliographicRecord, ExtractedImage, Metadata};
pub use document::{Declaration, Document, DocumentCategory};
pub use record::{
    CheckResults, DetectionResult, Diagnostic, DiagnosticKind, EvidenceRecord, TestName,
    TestResult, TestValue, TriState,
};
pub use version::{DeclaredVersion, Version, VersionSpace};

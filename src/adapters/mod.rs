//! Adapter interfaces for external collaborators.
//!
//! The decision engine never touches files, subprocesses or the network
//! directly. Text/metadata/image extraction, the bibliographic pipeline and
//! DOI resolution are injected through these traits, so tests can drive the
//! engine with deterministic fakes.

pub mod cermine;
pub mod doi;
pub mod sidecar;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BibliographicRecord, Document, ExtractedImage, Metadata};

// Re-export the concrete adapters
pub use cermine::{parse_jats, CermineAdapter, WorkingDir};
pub use doi::{HttpDoiResolver, OfflineResolver};
pub use sidecar::{ArtifactBundle, SidecarSource};

/// Source of already-extracted document artifacts.
///
/// An `Err` means the collaborator failed (extraction failure); `Ok(None)`
/// from `text` means it ran but produced nothing.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    async fn text(&self, document: &Document) -> Result<Option<String>>;

    async fn metadata(&self, document: &Document) -> Result<Metadata>;

    async fn images(&self, document: &Document) -> Result<Vec<ExtractedImage>>;
}

/// Secondary bibliographic-extraction pipeline
#[async_trait]
pub trait BibliographicPipeline: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the pipeline ran but produced no structured output
    async fn extract(&self, document: &Document) -> Result<Option<BibliographicRecord>>;
}

/// DOI resolution failures. Never the same thing as "does not resolve".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("DOI resolver unreachable for {doi}: {message}")]
    Network { doi: String, message: String },

    #[error("DOI resolution for {doi} timed out after {seconds}s")]
    Timeout { doi: String, seconds: u64 },
}

/// Liveness check for DOIs
#[async_trait]
pub trait DoiResolver: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(true)` if the DOI resolves, `Ok(false)` if the endpoint says it
    /// does not, `Err` if we could not find out
    async fn resolves(&self, doi: &str) -> std::result::Result<bool, ResolveError>;
}

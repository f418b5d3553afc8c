//! Artifact sidecar source.
//!
//! Reads artifacts produced ahead of time by an external extractor from a
//! JSON file next to the document (`paper.pdf` -> `paper.pdf.artifacts.json`)
//! or from an explicit path:
//!
//! ```json
//! {
//!   "text": "Full extracted text ...",
//!   "metadata": { "/Title": "Effects of drought on fern spores" },
//!   "images": [ { "name": "img_1_1.png", "page": 1, "hash": "ff00ff00ff00ff00" } ],
//!   "bibliographic": { "doi": "10.1000/xyz", "title": "...", "journal_title": "..." }
//! }
//! ```
//!
//! A missing sidecar is an extraction failure for every artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BibliographicPipeline, DocumentSource};
use crate::domain::{BibliographicRecord, Document, ExtractedImage, Metadata};

pub const SIDECAR_SUFFIX: &str = "artifacts.json";

/// Everything an external extractor produced for one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactBundle {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub images: Vec<ExtractedImage>,

    #[serde(default)]
    pub bibliographic: Option<BibliographicRecord>,
}

impl ArtifactBundle {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read artifact sidecar: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact sidecar: {}", path.display()))
    }
}

/// Default sidecar location for a document
pub fn sidecar_path(document_path: &Path) -> PathBuf {
    let mut name = document_path.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Document source reading JSON sidecars
#[derive(Debug, Clone, Default)]
pub struct SidecarSource {
    /// Explicit sidecar path; otherwise derived from the document path
    path: Option<PathBuf>,
}

impl SidecarSource {
    pub fn new() -> Self {
        Self { path: None }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn resolve(&self, document: &Document) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| sidecar_path(&document.path))
    }

    async fn bundle(&self, document: &Document) -> Result<ArtifactBundle> {
        ArtifactBundle::load(&self.resolve(document)).await
    }
}

#[async_trait]
impl DocumentSource for SidecarSource {
    fn name(&self) -> &str {
        "sidecar"
    }

    async fn text(&self, document: &Document) -> Result<Option<String>> {
        Ok(self.bundle(document).await?.text)
    }

    async fn metadata(&self, document: &Document) -> Result<Metadata> {
        Ok(self.bundle(document).await?.metadata)
    }

    async fn images(&self, document: &Document) -> Result<Vec<ExtractedImage>> {
        Ok(self.bundle(document).await?.images)
    }
}

#[async_trait]
impl BibliographicPipeline for SidecarSource {
    fn name(&self) -> &str {
        "sidecar"
    }

    async fn extract(&self, document: &Document) -> Result<Option<BibliographicRecord>> {
        Ok(self
            .bundle(document)
            .await?
            .bibliographic
            .filter(|record| !record.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Declaration;
    use tempfile::TempDir;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/in/paper.pdf")),
            PathBuf::from("/in/paper.pdf.artifacts.json")
        );
    }

    #[tokio::test]
    async fn test_reads_bundle() {
        let temp = TempDir::new().unwrap();
        let doc_path = temp.path().join("paper.pdf");
        std::fs::write(
            sidecar_path(&doc_path),
            r#"{
                "text": "Some text",
                "metadata": {"/Title": "A title"},
                "images": [{"name": "img_1_1.png", "page": 1, "hash": "00000000000000ff"}],
                "bibliographic": {"doi": "10.1000/xyz", "title": null, "journal_title": null}
            }"#,
        )
        .unwrap();

        let source = SidecarSource::new();
        let document = Document::new(&doc_path, Declaration::default());

        assert_eq!(source.text(&document).await.unwrap().as_deref(), Some("Some text"));
        assert_eq!(source.metadata(&document).await.unwrap()["/Title"], "A title");
        assert_eq!(source.images(&document).await.unwrap()[0].hash, Some(0xff));
        let record = source.extract(&document).await.unwrap().unwrap();
        assert_eq!(record.doi.as_deref(), Some("10.1000/xyz"));
    }

    #[tokio::test]
    async fn test_missing_sidecar_is_an_error() {
        let temp = TempDir::new().unwrap();
        let document = Document::new(temp.path().join("absent.pdf"), Declaration::default());
        assert!(SidecarSource::new().text(&document).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_bundle() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bundle.json");
        std::fs::write(&path, "{}").unwrap();

        let source = SidecarSource::with_path(&path);
        let document = Document::new("whatever.docx", Declaration::default());
        assert_eq!(source.text(&document).await.unwrap(), None);
        assert!(source.images(&document).await.unwrap().is_empty());
        assert!(source.extract(&document).await.unwrap().is_none());
    }
}

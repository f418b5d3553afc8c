//! Deterministic fakes for the adapter traits.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use msversion::adapters::{BibliographicPipeline, DocumentSource, DoiResolver, ResolveError};
use msversion::domain::{BibliographicRecord, Declaration, Document, ExtractedImage, Metadata};
use msversion::Detector;

pub const TITLE: &str = "Effects of drought on fern spore germination";

/// Text of about `chars` characters with the title near the top
pub fn article_text(title: &str, body: &str, chars: usize) -> String {
    let mut text = format!("Journal of Plant Studies\n\n{}\n\nA. Author, B. Author\n\n{}\n", title, body);
    let filler = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
    while text.chars().count() < chars {
        text.push_str(filler);
    }
    text
}

pub fn metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn declaration(title: Option<&str>, version: &str, doi: Option<&str>) -> Declaration {
    Declaration {
        title: title.map(str::to_string),
        version: Some(version.to_string()),
        doi: doi.map(str::to_string),
        authors: Vec::new(),
    }
}

/// Document source returning canned artifacts
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    pub text: Option<String>,
    pub metadata: Metadata,
    pub images: Vec<ExtractedImage>,
    pub fail_text: bool,
    pub fail_metadata: bool,
    pub fail_images: bool,
}

impl FakeSource {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn images(mut self, images: Vec<ExtractedImage>) -> Self {
        self.images = images;
        self
    }
}

#[async_trait]
impl DocumentSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn text(&self, _document: &Document) -> Result<Option<String>> {
        if self.fail_text {
            bail!("text extraction crashed");
        }
        Ok(self.text.clone())
    }

    async fn metadata(&self, _document: &Document) -> Result<Metadata> {
        if self.fail_metadata {
            bail!("metadata extraction crashed");
        }
        Ok(self.metadata.clone())
    }

    async fn images(&self, _document: &Document) -> Result<Vec<ExtractedImage>> {
        if self.fail_images {
            bail!("image extraction crashed");
        }
        Ok(self.images.clone())
    }
}

/// Bibliographic pipeline returning a canned record
#[derive(Debug, Clone, Default)]
pub struct FakePipeline {
    pub record: Option<BibliographicRecord>,
    pub fail: bool,
}

impl FakePipeline {
    pub fn with_record(doi: Option<&str>, title: Option<&str>) -> Self {
        Self {
            record: Some(BibliographicRecord {
                doi: doi.map(str::to_string),
                title: title.map(str::to_string),
                journal_title: Some("Journal of Plant Studies".to_string()),
            }),
            fail: false,
        }
    }
}

#[async_trait]
impl BibliographicPipeline for FakePipeline {
    fn name(&self) -> &str {
        "fake"
    }

    async fn extract(&self, _document: &Document) -> Result<Option<BibliographicRecord>> {
        if self.fail {
            bail!("bibliographic pipeline exited with status 1");
        }
        Ok(self.record.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverMode {
    Resolves,
    DoesNotResolve,
    NetworkError,
    Hang,
}

/// DOI resolver with a fixed behaviour that records every lookup
#[derive(Debug, Clone)]
pub struct FakeResolver {
    pub mode: ResolverMode,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeResolver {
    pub fn new(mode: ResolverMode) -> Self {
        Self {
            mode,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DoiResolver for FakeResolver {
    fn name(&self) -> &str {
        "fake"
    }

    async fn resolves(&self, doi: &str) -> std::result::Result<bool, ResolveError> {
        self.calls.lock().unwrap().push(doi.to_string());
        match self.mode {
            ResolverMode::Resolves => Ok(true),
            ResolverMode::DoesNotResolve => Ok(false),
            ResolverMode::NetworkError => Err(ResolveError::Network {
                doi: doi.to_string(),
                message: "connection reset by peer".to_string(),
            }),
            ResolverMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(true)
            }
        }
    }
}

pub fn detector(source: FakeSource, pipeline: FakePipeline, resolver: FakeResolver) -> Detector {
    Detector::new(Arc::new(source), Arc::new(pipeline), Arc::new(resolver))
}

//! Decision engine: routes a document to its workflow and finalizes the result.
//!
//! # Design Decisions
//!
//! - Every evaluation gets a fresh `EvidenceRecord`; nothing leaks between
//!   documents.
//! - Adapters and catalogues are shared behind `Arc`, so a `Detector` is
//!   cheap to clone into concurrent tasks.
//! - Only an unsupported category or an unusable input path is fatal;
//!   everything else degrades individual tests.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::adapters::{BibliographicPipeline, DocumentSource, DoiResolver};
use crate::domain::{DetectionResult, Document, DocumentCategory, EvidenceRecord, VersionSpace};
use crate::evidence::{CcLicence, LogoCatalogue, CC_LICENCES};

use super::thresholds::{Thresholds, Timeouts};
use super::workflow::{evaluate_editable, evaluate_fixed_layout, EvaluationContext};

/// Errors that abort an evaluation
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Unsupported input {path}: no workflow for extension '{extension}'")]
    UnsupportedInput { path: PathBuf, extension: String },

    #[error("Could not create evidence record for {path}: {reason}")]
    RecordInit { path: PathBuf, reason: String },
}

/// Manuscript version detector
#[derive(Clone)]
pub struct Detector {
    source: Arc<dyn DocumentSource>,
    pipeline: Arc<dyn BibliographicPipeline>,
    resolver: Arc<dyn DoiResolver>,
    logos: Arc<LogoCatalogue>,
    licences: &'static [CcLicence],
    thresholds: Thresholds,
    timeouts: Timeouts,
}

impl Detector {
    /// Create a detector with an empty logo catalogue and default limits
    pub fn new(
        source: Arc<dyn DocumentSource>,
        pipeline: Arc<dyn BibliographicPipeline>,
        resolver: Arc<dyn DoiResolver>,
    ) -> Self {
        Self {
            source,
            pipeline,
            resolver,
            logos: Arc::new(LogoCatalogue::default()),
            licences: CC_LICENCES,
            thresholds: Thresholds::default(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_logos(mut self, logos: Arc<LogoCatalogue>) -> Self {
        self.logos = logos;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate one document
    #[instrument(skip(self, document), fields(file = %document.file_name()))]
    pub async fn detect(&self, document: &Document) -> Result<DetectionResult, DetectError> {
        let category = document.category();
        let space = match category {
            DocumentCategory::Editable => VersionSpace::editable(),
            DocumentCategory::FixedLayout => VersionSpace::fixed_layout(),
            DocumentCategory::Unsupported => {
                return Err(DetectError::UnsupportedInput {
                    path: document.path.clone(),
                    extension: document
                        .path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                })
            }
        };
        let mut record = init_record(document, category, space)?;

        let ctx = EvaluationContext {
            source: self.source.as_ref(),
            pipeline: self.pipeline.as_ref(),
            resolver: self.resolver.as_ref(),
            logos: self.logos.as_ref(),
            licences: self.licences,
            thresholds: &self.thresholds,
            timeouts: &self.timeouts,
        };

        if category == DocumentCategory::Editable {
            evaluate_editable(&ctx, document, &mut record).await;
        } else {
            evaluate_fixed_layout(&ctx, document, &mut record).await;
        }

        let result = record.finalize();
        info!(
            %category,
            approve_deposit = result.approve_deposit,
            reason = %result.reason,
            "Evaluation complete"
        );
        Ok(result)
    }
}

fn init_record(
    document: &Document,
    category: DocumentCategory,
    space: VersionSpace,
) -> Result<EvidenceRecord, DetectError> {
    if document.path.file_name().is_none() {
        return Err(DetectError::RecordInit {
            path: document.path.clone(),
            reason: "path has no file name".to_string(),
        });
    }

    Ok(EvidenceRecord::new(document.file_name(), category, space))
}

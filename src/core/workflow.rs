//! Evaluation workflows, one per document category.
//!
//! Both workflows run their tests in a fixed order, record every outcome,
//! then apply a decision step that only ever approves through an explicit
//! positive rule. Collaborator calls are bounded by the configured
//! timeouts; a failure or timeout degrades only the tests that needed that
//! artifact.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::adapters::{BibliographicPipeline, DoiResolver, DocumentSource};
use crate::domain::{Document, EvidenceRecord, TestName, TestValue, TriState, Version};
use crate::evidence::{corroborated_versions, CcLicence, FuzzyMatcher, LogoCatalogue};

use super::heuristics::{self, Availability};
use super::thresholds::{Thresholds, Timeouts};

pub const REASON_PLAUSIBLE: &str = "Declared version is plausible";
pub const REASON_PUBLISHER_WARNING: &str =
    "File shows evidence of publisher generation, but declared version is author-generated";
pub const REASON_PUBLISHER_NO_LICENCE: &str = "publisher-generated, no licence evidence";
pub const REASON_NO_PUBLISHER_EVIDENCE: &str = "no evidence of publisher generation";

/// Shared, read-only collaborators for one evaluation
pub struct EvaluationContext<'a> {
    pub source: &'a dyn DocumentSource,
    pub pipeline: &'a dyn BibliographicPipeline,
    pub resolver: &'a dyn DoiResolver,
    pub logos: &'a LogoCatalogue,
    pub licences: &'a [CcLicence],
    pub thresholds: &'a Thresholds,
    pub timeouts: &'a Timeouts,
}

/// Await a collaborator call under a time limit
async fn fetch<T, F>(what: &str, limit: Duration, call: F) -> Availability<T>
where
    F: Future<Output = Result<Option<T>>>,
{
    match timeout(limit, call).await {
        Ok(result) => {
            let availability = Availability::from_result(result);
            if let Availability::Failed(message) = &availability {
                warn!(artifact = what, error = %message, "Extraction failed");
            }
            availability
        }
        Err(_) => {
            warn!(artifact = what, ?limit, "Extraction timed out");
            Availability::Failed(format!("{} timed out after {:?}", what, limit))
        }
    }
}

fn declared_version_label(document: &Document) -> String {
    document
        .declaration
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("not declared")
        .to_string()
}

pub fn mismatch_reason(document: &Document) -> String {
    format!(
        "This is either a submitted or accepted version, but declared version is {}",
        declared_version_label(document)
    )
}

pub fn title_not_found_reason(document: &Document) -> String {
    format!(
        "Could not find declared title ({}) in file {}",
        document.declaration.title().unwrap_or("not declared"),
        document.file_name()
    )
}

pub fn too_short_reason(document: &Document) -> String {
    format!(
        "File {} is quite short for a journal article. Please check.",
        document.file_name()
    )
}

pub fn licence_reason(licence: &str) -> String {
    format!(
        "Creative Commons licence detected in extracted text ({})",
        licence
    )
}

/// `long_enough AND (title in metadata OR title in text)`, three-valued.
///
/// Records the sanity check when it did not pass and returns whether it
/// passed. On failure the reason names the length problem in preference to
/// the missing title.
fn sanity_gate(record: &mut EvidenceRecord, document: &Document) -> bool {
    let long_enough = record.outcome(TestName::LengthOfExtractedText);
    let title_found = record
        .outcome(TestName::TitleMatchInFileMetadata)
        .or(record.outcome(TestName::TitleMatchInExtractedText));
    let sanity = long_enough.and(title_found);

    if sanity.is_true() {
        record.set_sanity_check(TriState::True);
        return true;
    }

    record.set_sanity_check(sanity);
    if long_enough.is_true() {
        record.reject(title_not_found_reason(document));
    } else {
        record.reject(too_short_reason(document));
    }
    false
}

/// Text and matcher for the text-stage tests
async fn fetch_text(
    ctx: &EvaluationContext<'_>,
    document: &Document,
) -> (Availability<String>, Availability<FuzzyMatcher>) {
    let text = fetch(
        "extracted text",
        ctx.timeouts.extraction(),
        ctx.source.text(document),
    )
    .await;
    let matcher = text.map(|t| FuzzyMatcher::new(t));
    (text, matcher)
}

/// Editable documents: title and length checks, then the declared version
/// must still be a candidate.
#[instrument(skip_all, fields(file = %document.file_name()))]
pub async fn evaluate_editable(
    ctx: &EvaluationContext<'_>,
    document: &Document,
    record: &mut EvidenceRecord,
) {
    let declaration = &document.declaration;
    let category = document.category();

    let metadata = fetch("file metadata", ctx.timeouts.extraction(), async {
        ctx.source.metadata(document).await.map(Some)
    })
    .await;
    record.record(
        TestName::TitleMatchInFileMetadata,
        heuristics::title_match_in_metadata(
            declaration.title(),
            &metadata,
            category.title_metadata_key(),
            ctx.thresholds.min_title_similarity,
        ),
    );

    let (text, matcher) = fetch_text(ctx, document).await;
    record.record(
        TestName::LengthOfExtractedText,
        heuristics::length_of_extracted_text(&text, ctx.thresholds.min_text_length()),
    );
    record.record(
        TestName::TitleMatchInExtractedText,
        heuristics::title_match_in_extracted_text(
            declaration.title(),
            &matcher,
            ctx.thresholds.title_error_ratio,
            ctx.thresholds.first_page(),
        ),
    );

    decide_editable(record, document);
}

/// Verdict for an editable document whose tests have all run
pub fn decide_editable(record: &mut EvidenceRecord, document: &Document) {
    if !sanity_gate(record, document) {
        return;
    }

    match document.declaration.declared_version() {
        Some(declared) if record.space().any_possible(declared.versions()) => {
            record.approve(REASON_PLAUSIBLE);
        }
        _ => record.reject(mismatch_reason(document)),
    }
}

/// Fixed-layout documents: accumulate metadata, text, bibliographic and
/// image evidence, refine the candidate space, then branch on publisher
/// signposts.
#[instrument(skip_all, fields(file = %document.file_name()))]
pub async fn evaluate_fixed_layout(
    ctx: &EvaluationContext<'_>,
    document: &Document,
    record: &mut EvidenceRecord,
) {
    let declaration = &document.declaration;
    let category = document.category();

    // Metadata
    let metadata = fetch("file metadata", ctx.timeouts.extraction(), async {
        ctx.source.metadata(document).await.map(Some)
    })
    .await;
    record.record(
        TestName::TitleMatchInFileMetadata,
        heuristics::title_match_in_metadata(
            declaration.title(),
            &metadata,
            category.title_metadata_key(),
            ctx.thresholds.min_title_similarity,
        ),
    );
    let publisher_tags = record.record(
        TestName::PublisherTagsInFileMetadata,
        heuristics::publisher_tags_in_file_metadata(&metadata),
    );
    if publisher_tags.is_true() {
        debug!("Publisher tags found, excluding author manuscripts");
        record.space_mut().exclude(&Version::AUTHOR_MANUSCRIPTS);
    }

    // Extracted text
    let (text, matcher) = fetch_text(ctx, document).await;
    record.record(
        TestName::LengthOfExtractedText,
        heuristics::length_of_extracted_text(&text, ctx.thresholds.min_text_length()),
    );
    record.record(
        TestName::TitleMatchInExtractedText,
        heuristics::title_match_in_extracted_text(
            declaration.title(),
            &matcher,
            ctx.thresholds.title_error_ratio,
            ctx.thresholds.first_page(),
        ),
    );
    record.record(
        TestName::DoiInExtractedText,
        heuristics::doi_in_extracted_text(&matcher),
    );
    let doi_in_text = match record.value(TestName::DoiInExtractedText) {
        Some(TestValue::Match(found)) => Some(found.matched.clone()),
        _ => None,
    };
    if let Some(doi) = doi_in_text {
        record.record(
            TestName::DoiResolvesExtractedText,
            heuristics::doi_resolves(
                ctx.resolver,
                Some(&doi),
                declaration.doi(),
                ctx.timeouts.doi_resolution(),
            )
            .await,
        );
    }
    record.record(
        TestName::CcLicenceInExtractedText,
        heuristics::cc_licence_in_extracted_text(&matcher, ctx.licences),
    );

    // Bibliographic pipeline
    let bibliographic = fetch(
        "bibliographic record",
        ctx.timeouts.bibliographic(),
        ctx.pipeline.extract(document),
    )
    .await;
    if let Some(doi) = bibliographic.as_ref().and_then(|r| r.doi.clone()) {
        record.record(
            TestName::DoiResolvesBibliographicXml,
            heuristics::doi_resolves(
                ctx.resolver,
                Some(&doi),
                declaration.doi(),
                ctx.timeouts.doi_resolution(),
            )
            .await,
        );
    }
    record.record(
        TestName::DoiMatchBibliographicXml,
        heuristics::doi_match_bibliographic_xml(declaration.doi(), &bibliographic),
    );
    record.record(
        TestName::TitleMatchInBibliographicXml,
        heuristics::title_match_in_bibliographic_xml(
            declaration.title(),
            &bibliographic,
            ctx.thresholds.min_title_similarity,
        ),
    );

    // Images
    let images = fetch("extracted images", ctx.timeouts.extraction(), async {
        ctx.source.images(document).await.map(Some)
    })
    .await;
    record.record(
        TestName::ImageOnFirstPage,
        heuristics::image_on_first_page(&images),
    );
    record.record(
        TestName::PublisherLogos,
        heuristics::publisher_logos(&images, ctx.logos, ctx.thresholds.max_logo_distance),
    );

    refine_with_logos(record);
    decide_fixed_layout(record, document);
}

/// Keep only candidates corroborated by a detected logo. No logos, no change.
pub fn refine_with_logos(record: &mut EvidenceRecord) {
    let corroborated = match record.value(TestName::PublisherLogos) {
        Some(TestValue::Logos(detected)) if !detected.is_empty() => corroborated_versions(detected),
        _ => return,
    };

    debug!(before = ?record.space().possible(), suggested = ?corroborated, "Refining candidates with logos");
    record.space_mut().retain_corroborated(&corroborated);
    debug!(after = ?record.space().possible(), "Refined candidates");
}

/// Verdict for a fixed-layout document whose tests have all run
pub fn decide_fixed_layout(record: &mut EvidenceRecord, document: &Document) {
    if !sanity_gate(record, document) {
        return;
    }

    let claims_manuscript = document
        .declaration
        .declared_version()
        .is_some_and(|v| v.is_author_manuscript());
    let publisher_tags = record.outcome(TestName::PublisherTagsInFileMetadata).is_true();
    let licence = match record.value(TestName::CcLicenceInExtractedText) {
        Some(TestValue::Licence(found)) => Some(found.licence.clone()),
        _ => None,
    };

    if publisher_tags || licence.is_some() {
        record.space_mut().exclude(&Version::AUTHOR_MANUSCRIPTS);
        if claims_manuscript {
            record.set_reason(REASON_PUBLISHER_WARNING);
        }
        match licence {
            Some(licence) => record.approve(licence_reason(&licence)),
            None => record.reject(REASON_PUBLISHER_NO_LICENCE),
        }
    } else if claims_manuscript {
        record.approve(REASON_NO_PUBLISHER_EVIDENCE);
    } else {
        record.reject(mismatch_reason(document));
    }
}

//! Heuristic tests.
//!
//! Each test is an independent function returning `anyhow::Result<TestResult>`.
//! A test that cannot run because an input is missing returns `Ok` with an
//! indeterminate result and a typed diagnostic; `Err` is reserved for internal
//! faults, which `EvidenceRecord::record` downgrades at the test boundary.
//!
//! # Design Decisions
//!
//! - Inputs arrive as [`Availability`] values, so "extractor produced
//!   nothing" and "extractor failed" stay distinct all the way to the
//!   diagnostic.
//! - DOI resolution failures are `NetworkFailure` diagnostics and never a
//!   `False` outcome.

use std::time::Duration;

use anyhow::Result;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::adapters::{DoiResolver, ResolveError};
use crate::domain::{
    BibliographicRecord, DiagnosticKind, ExtractedImage, Metadata, TestResult, TestValue, TriState,
};
use crate::evidence::{
    find_licence, similarity_ratio, CcLicence, ExpectedWindow, FuzzyMatcher, LogoCatalogue, Query,
    DOI_PATTERN, PUBLISHER_METADATA_TAGS,
};

/// An artifact requested from a collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
    Available(T),
    /// The collaborator ran but produced nothing
    Absent,
    /// The collaborator failed
    Failed(String),
}

impl<T> Availability<T> {
    pub fn from_result(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Availability::Available(value),
            Ok(None) => Availability::Absent,
            Err(e) => Availability::Failed(format!("{:#}", e)),
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Availability::Available(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> Availability<U> {
        match self {
            Availability::Available(value) => Availability::Available(f(value)),
            Availability::Absent => Availability::Absent,
            Availability::Failed(message) => Availability::Failed(message.clone()),
        }
    }

    /// The value, or the indeterminate result a test should return without it
    fn require(&self, what: &str) -> std::result::Result<&T, TestResult> {
        match self {
            Availability::Available(value) => Ok(value),
            Availability::Absent => Err(TestResult::missing(format!("No {} available", what))),
            Availability::Failed(message) => Err(TestResult::indeterminate(
                DiagnosticKind::ExtractionFailure,
                format!("Could not obtain {}: {}", what, message),
            )),
        }
    }
}

fn title_similarity(found: &str, declared: &str, min_similarity: f64) -> TestResult {
    let ratio = similarity_ratio(found, declared);
    debug!(ratio, min_similarity, "Compared titles");
    TestResult::from_bool(ratio >= min_similarity).with_value(TestValue::Similarity(ratio))
}

/// Declared title against the title field of the file metadata
pub fn title_match_in_metadata(
    declared_title: Option<&str>,
    metadata: &Availability<Metadata>,
    title_key: &str,
    min_similarity: f64,
) -> Result<TestResult> {
    let Some(declared) = declared_title else {
        return Ok(TestResult::missing("No declared title, so cannot test match"));
    };
    let metadata = match metadata.require("file metadata") {
        Ok(metadata) => metadata,
        Err(result) => return Ok(result),
    };
    let Some(found) = metadata.get(title_key).filter(|v| !v.trim().is_empty()) else {
        return Ok(TestResult::missing(format!(
            "File metadata has no {} field, so cannot test match",
            title_key
        )));
    };

    Ok(title_similarity(found, declared, min_similarity))
}

/// Extracted text is at least `min_length` chars long
pub fn length_of_extracted_text(
    text: &Availability<String>,
    min_length: usize,
) -> Result<TestResult> {
    let text = match text.require("extracted text") {
        Ok(text) => text,
        Err(result) => return Ok(result),
    };
    let length = text.chars().count();
    debug!(length, min_length, "Measured extracted text");
    Ok(TestResult::from_bool(length >= min_length).with_value(TestValue::Length(length)))
}

/// Approximate search for the declared title anywhere in the text.
///
/// A match outside `first_page` still counts but carries a note.
pub fn title_match_in_extracted_text(
    declared_title: Option<&str>,
    matcher: &Availability<FuzzyMatcher>,
    max_error_ratio: f64,
    first_page: ExpectedWindow,
) -> Result<TestResult> {
    let Some(declared) = declared_title else {
        return Ok(TestResult::missing("No declared title, so cannot test match"));
    };
    let matcher = match matcher.require("extracted text") {
        Ok(matcher) => matcher,
        Err(result) => return Ok(result),
    };

    let found = matcher.search(Query::Literal(declared), max_error_ratio, first_page)?;
    Ok(match found {
        Some(m) => {
            let outside = !m.within_expected_window;
            let result = TestResult::new(TriState::True).with_value(TestValue::Match(m));
            if outside {
                result.with_note("Title found outside the first page")
            } else {
                result
            }
        }
        None => TestResult::new(TriState::False),
    })
}

/// Presence of a DOI-shaped token. Says nothing about validity.
pub fn doi_in_extracted_text(matcher: &Availability<FuzzyMatcher>) -> Result<TestResult> {
    let matcher = match matcher.require("extracted text") {
        Ok(matcher) => matcher,
        Err(result) => return Ok(result),
    };

    let found = matcher.search(Query::Pattern(DOI_PATTERN), 0.0, ExpectedWindow::default())?;
    Ok(match found {
        Some(m) => {
            debug!(doi = %m.matched, "Found DOI in extracted text");
            TestResult::new(TriState::True).with_value(TestValue::Match(m))
        }
        None => TestResult::new(TriState::False),
    })
}

/// Liveness check for `doi`, falling back to the declared DOI
pub async fn doi_resolves(
    resolver: &dyn DoiResolver,
    doi: Option<&str>,
    declared_doi: Option<&str>,
    limit: Duration,
) -> Result<TestResult> {
    let Some(doi) = doi.or(declared_doi) else {
        return Ok(TestResult::missing("DOI not known, so cannot test resolution"));
    };

    let outcome = match timeout(limit, resolver.resolves(doi)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ResolveError::Timeout {
            doi: doi.to_string(),
            seconds: limit.as_secs(),
        }),
    };

    Ok(match outcome {
        Ok(resolves) => {
            debug!(%doi, resolves, resolver = resolver.name(), "Checked DOI");
            TestResult::from_bool(resolves).with_value(TestValue::Doi(doi.to_string()))
        }
        Err(e) => {
            warn!(%doi, error = %e, "DOI resolution failed");
            TestResult::indeterminate(DiagnosticKind::NetworkFailure, e.to_string())
                .with_value(TestValue::Doi(doi.to_string()))
        }
    })
}

/// First Creative Commons licence statement in the text
pub fn cc_licence_in_extracted_text(
    matcher: &Availability<FuzzyMatcher>,
    catalogue: &[CcLicence],
) -> Result<TestResult> {
    let matcher = match matcher.require("extracted text") {
        Ok(matcher) => matcher,
        Err(result) => return Ok(result),
    };

    Ok(match find_licence(matcher, catalogue)? {
        Some(found) => {
            debug!(licence = %found.licence, "Found Creative Commons statement in extracted text");
            TestResult::new(TriState::True).with_value(TestValue::Licence(found))
        }
        None => TestResult::new(TriState::False)
            .with_note("No evidence of a Creative Commons licence in extracted text"),
    })
}

/// Publisher-only metadata tags present with a non-empty value
pub fn publisher_tags_in_file_metadata(metadata: &Availability<Metadata>) -> Result<TestResult> {
    let metadata = match metadata.require("file metadata") {
        Ok(metadata) => metadata,
        Err(result) => return Ok(result),
    };

    let mut tags = Vec::new();
    for tag in PUBLISHER_METADATA_TAGS {
        match metadata.get(*tag) {
            Some(value) if !value.trim().is_empty() => {
                debug!(%tag, "Found publisher tag in file metadata");
                tags.push(tag.to_string());
            }
            Some(_) => debug!(%tag, "Publisher tag in file metadata has no value"),
            None => {}
        }
    }

    Ok(TestResult::from_bool(!tags.is_empty()).with_value(TestValue::Tags(tags)))
}

fn bibliographic<'a>(
    record: &'a Availability<BibliographicRecord>,
) -> std::result::Result<&'a BibliographicRecord, TestResult> {
    record.require("bibliographic record")
}

/// Declared DOI equals the bibliographic DOI (case-insensitive)
pub fn doi_match_bibliographic_xml(
    declared_doi: Option<&str>,
    record: &Availability<BibliographicRecord>,
) -> Result<TestResult> {
    let Some(declared) = declared_doi else {
        return Ok(TestResult::missing("No declared DOI, so cannot test match"));
    };
    let record = match bibliographic(record) {
        Ok(record) => record,
        Err(result) => return Ok(result),
    };
    let Some(extracted) = record.doi.as_deref() else {
        return Ok(TestResult::missing("Bibliographic record has no DOI"));
    };

    let matches = declared.trim().eq_ignore_ascii_case(extracted.trim());
    Ok(TestResult::from_bool(matches).with_value(TestValue::Doi(extracted.to_string())))
}

/// Declared title against the bibliographic title
pub fn title_match_in_bibliographic_xml(
    declared_title: Option<&str>,
    record: &Availability<BibliographicRecord>,
    min_similarity: f64,
) -> Result<TestResult> {
    let Some(declared) = declared_title else {
        return Ok(TestResult::missing("No declared title, so cannot test match"));
    };
    let record = match bibliographic(record) {
        Ok(record) => record,
        Err(result) => return Ok(result),
    };
    let Some(found) = record.title.as_deref() else {
        return Ok(TestResult::missing("Bibliographic record has no title"));
    };

    Ok(title_similarity(found, declared, min_similarity))
}

/// Some extracted image sits on page 1
pub fn image_on_first_page(images: &Availability<Vec<ExtractedImage>>) -> Result<TestResult> {
    let images = match images.require("extracted images") {
        Ok(images) => images,
        Err(result) => return Ok(result),
    };
    Ok(TestResult::from_bool(images.iter().any(ExtractedImage::is_on_first_page)))
}

/// Extracted images matching the publisher logo catalogue
pub fn publisher_logos(
    images: &Availability<Vec<ExtractedImage>>,
    catalogue: &LogoCatalogue,
    max_distance: u32,
) -> Result<TestResult> {
    let images = match images.require("extracted images") {
        Ok(images) => images,
        Err(result) => return Ok(result),
    };

    let detected = catalogue.detect(images, max_distance);
    for logo in &detected {
        debug!(logo = %logo.name, image = %logo.image, distance = logo.distance, "Detected publisher logo");
    }
    Ok(TestResult::from_bool(!detected.is_empty()).with_value(TestValue::Logos(detected)))
}

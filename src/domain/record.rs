//! Per-document evidence accumulation and the finalized result.
//!
//! An `EvidenceRecord` is created fresh for every evaluation, mutated by
//! each heuristic test and by the decision step, then consumed by
//! `finalize()` into an immutable `DetectionResult`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::document::DocumentCategory;
use super::version::{Version, VersionSpace};
use crate::evidence::{DetectedLogo, LicenceMatch, MatchResult};

/// Outcome of a heuristic test.
///
/// Serialized as `true` / `false` / `null` for consumers that expect a
/// nullable boolean, but inside the engine `Indeterminate` is never a
/// falsy `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TriState {
    True,
    False,
    #[default]
    Indeterminate,
}

impl TriState {
    pub fn is_true(&self) -> bool {
        matches!(self, TriState::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, TriState::False)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, TriState::Indeterminate)
    }

    /// Three-valued conjunction: any `False` wins, then `Indeterminate`
    pub fn and(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::True, TriState::True) => TriState::True,
            _ => TriState::Indeterminate,
        }
    }

    /// Three-valued disjunction: any `True` wins, then `Indeterminate`
    pub fn or(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::False, TriState::False) => TriState::False,
            _ => TriState::Indeterminate,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map(TriState::from).unwrap_or(TriState::Indeterminate)
    }
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        match value {
            TriState::True => Some(true),
            TriState::False => Some(false),
            TriState::Indeterminate => None,
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriState::True => write!(f, "true"),
            TriState::False => write!(f, "false"),
            TriState::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Stable names of the heuristic tests (keys of the result map)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestName {
    TitleMatchInFileMetadata,
    LengthOfExtractedText,
    TitleMatchInExtractedText,
    DoiInExtractedText,
    DoiResolvesExtractedText,
    CcLicenceInExtractedText,
    PublisherTagsInFileMetadata,
    DoiResolvesBibliographicXml,
    DoiMatchBibliographicXml,
    TitleMatchInBibliographicXml,
    ImageOnFirstPage,
    PublisherLogos,
}

impl TestName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestName::TitleMatchInFileMetadata => "title_match_in_file_metadata",
            TestName::LengthOfExtractedText => "length_of_extracted_text",
            TestName::TitleMatchInExtractedText => "title_match_in_extracted_text",
            TestName::DoiInExtractedText => "doi_in_extracted_text",
            TestName::DoiResolvesExtractedText => "doi_resolves_extracted_text",
            TestName::CcLicenceInExtractedText => "cc_licence_in_extracted_text",
            TestName::PublisherTagsInFileMetadata => "publisher_tags_in_file_metadata",
            TestName::DoiResolvesBibliographicXml => "doi_resolves_bibliographic_xml",
            TestName::DoiMatchBibliographicXml => "doi_match_bibliographic_xml",
            TestName::TitleMatchInBibliographicXml => "title_match_in_bibliographic_xml",
            TestName::ImageOnFirstPage => "image_on_first_page",
            TestName::PublisherLogos => "publisher_logos",
        }
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a test could not produce a True/False answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Declared title/version/DOI absent
    MissingPrecondition,
    /// A collaborator could not produce text, metadata or images
    ExtractionFailure,
    /// DOI endpoint unreachable or timed out
    NetworkFailure,
    /// The test itself failed
    InternalFault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Typed payload a test may carry alongside its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestValue {
    Match(MatchResult),
    Similarity(f64),
    Length(usize),
    Tags(Vec<String>),
    Licence(LicenceMatch),
    Logos(Vec<DetectedLogo>),
    Doi(String),
}

/// Result of a single heuristic test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub outcome: TriState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<TestValue>,

    /// Present whenever the outcome is indeterminate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,

    /// Free-form audit note for moderators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TestResult {
    pub fn new(outcome: TriState) -> Self {
        Self {
            outcome,
            value: None,
            diagnostic: None,
            note: None,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self::new(TriState::from(value))
    }

    pub fn indeterminate(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            outcome: TriState::Indeterminate,
            value: None,
            diagnostic: Some(Diagnostic {
                kind,
                message: message.into(),
            }),
            note: None,
        }
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::indeterminate(DiagnosticKind::MissingPrecondition, message)
    }

    pub fn with_value(mut self, value: TestValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Mutable per-document accumulator
#[derive(Debug)]
pub struct EvidenceRecord {
    input_file: String,
    category: DocumentCategory,
    sanity_check: TriState,
    approve_deposit: bool,
    reason: Option<String>,
    space: VersionSpace,
    test_results: BTreeMap<TestName, TestResult>,
}

impl EvidenceRecord {
    pub fn new(input_file: impl Into<String>, category: DocumentCategory, space: VersionSpace) -> Self {
        Self {
            input_file: input_file.into(),
            category,
            sanity_check: TriState::Indeterminate,
            approve_deposit: false,
            reason: None,
            space,
            test_results: BTreeMap::new(),
        }
    }

    pub fn input_file(&self) -> &str {
        &self.input_file
    }

    /// Store a test result.
    ///
    /// A test that returned an error is downgraded to `Indeterminate` with an
    /// `InternalFault` diagnostic; the remaining tests still run.
    pub fn record(&mut self, name: TestName, result: anyhow::Result<TestResult>) -> TriState {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!(test = %name, error = %format!("{:#}", e), "Test failed, recording as indeterminate");
                TestResult::indeterminate(DiagnosticKind::InternalFault, format!("{:#}", e))
            }
        };

        debug!(test = %name, outcome = %result.outcome, "Recorded test result");
        let outcome = result.outcome;
        self.test_results.insert(name, result);
        outcome
    }

    /// Outcome of a recorded test; tests that never ran are indeterminate
    pub fn outcome(&self, name: TestName) -> TriState {
        self.test_results
            .get(&name)
            .map(|r| r.outcome)
            .unwrap_or(TriState::Indeterminate)
    }

    pub fn result(&self, name: TestName) -> Option<&TestResult> {
        self.test_results.get(&name)
    }

    pub fn value(&self, name: TestName) -> Option<&TestValue> {
        self.result(name).and_then(|r| r.value.as_ref())
    }

    pub fn space(&self) -> &VersionSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut VersionSpace {
        &mut self.space
    }

    pub fn sanity_check(&self) -> TriState {
        self.sanity_check
    }

    pub fn set_sanity_check(&mut self, value: TriState) {
        self.sanity_check = value;
    }

    pub fn approve_deposit(&self) -> bool {
        self.approve_deposit
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Stage a reason without changing the verdict
    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
    }

    /// Approve deposit. Refused unless the sanity check passed.
    pub fn approve(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.sanity_check.is_true() {
            error!(
                input_file = %self.input_file,
                reason = %reason,
                "Refusing to approve deposit without a passing sanity check"
            );
            self.approve_deposit = false;
            self.reason = Some(reason);
            return;
        }
        self.approve_deposit = true;
        self.reason = Some(reason);
    }

    pub fn reject(&mut self, reason: impl Into<String>) {
        self.approve_deposit = false;
        self.reason = Some(reason.into());
    }

    /// Consume the record into an immutable, serializable result
    pub fn finalize(self) -> DetectionResult {
        DetectionResult {
            evaluation_id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            input_file: self.input_file,
            category: self.category,
            approve_deposit: self.approve_deposit,
            reason: self
                .reason
                .unwrap_or_else(|| "No decision was reached".to_string()),
            version_confidence: self.space.confidence_report(),
            possible_versions: self.space.possible(),
            check_results: CheckResults {
                sanity_check: self.sanity_check,
            },
            test_results: self.test_results,
        }
    }
}

/// High-level checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResults {
    pub sanity_check: TriState,
}

/// Finalized evaluation of one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub input_file: String,
    pub category: DocumentCategory,
    pub approve_deposit: bool,
    pub reason: String,
    pub version_confidence: BTreeMap<String, f64>,
    pub possible_versions: Vec<Version>,
    pub check_results: CheckResults,
    pub test_results: BTreeMap<TestName, TestResult>,
}

impl DetectionResult {
    pub fn outcome(&self, name: TestName) -> TriState {
        self.test_results
            .get(&name)
            .map(|r| r.outcome)
            .unwrap_or(TriState::Indeterminate)
    }

    pub fn sanity_check(&self) -> TriState {
        self.check_results.sanity_check
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

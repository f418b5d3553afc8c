//! DOI Resolution Integration Tests
//!
//! A DOI that does not resolve is evidence; a resolver that cannot be
//! reached is not.

mod common;

use std::time::{Duration, Instant};

use common::*;
use msversion::core::Timeouts;
use msversion::domain::{DiagnosticKind, TestValue};
use msversion::{Document, TestName};

const DOI: &str = "10.1000/jps.2020.123";

fn text_with_doi() -> FakeSource {
    let body = format!("Available online at https://doi.org/{} (2020)", DOI);
    FakeSource::with_text(article_text(TITLE, &body, 10_000))
}

fn pdf() -> Document {
    Document::new("paper.pdf", declaration(Some(TITLE), "accepted version", None))
}

#[tokio::test]
async fn test_found_doi_is_looked_up() {
    let resolver = FakeResolver::new(ResolverMode::Resolves);
    let detector = detector(text_with_doi(), FakePipeline::default(), resolver.clone());

    let result = detector.detect(&pdf()).await.unwrap();

    assert!(result.outcome(TestName::DoiInExtractedText).is_true());
    assert!(result.outcome(TestName::DoiResolvesExtractedText).is_true());
    assert_eq!(resolver.calls(), vec![DOI.to_string()]);
}

#[tokio::test]
async fn test_unresolved_doi_is_false() {
    let detector = detector(
        text_with_doi(),
        FakePipeline::default(),
        FakeResolver::new(ResolverMode::DoesNotResolve),
    );

    let result = detector.detect(&pdf()).await.unwrap();

    let resolves = &result.test_results[&TestName::DoiResolvesExtractedText];
    assert!(resolves.outcome.is_false());
    assert!(resolves.diagnostic.is_none());
}

#[tokio::test]
async fn test_network_error_is_indeterminate_not_false() {
    let detector = detector(
        text_with_doi(),
        FakePipeline::default(),
        FakeResolver::new(ResolverMode::NetworkError),
    );

    let result = detector.detect(&pdf()).await.unwrap();

    let resolves = &result.test_results[&TestName::DoiResolvesExtractedText];
    assert!(resolves.outcome.is_indeterminate());
    assert_eq!(
        resolves.diagnostic.as_ref().unwrap().kind,
        DiagnosticKind::NetworkFailure
    );
    assert_eq!(resolves.value, Some(TestValue::Doi(DOI.to_string())));
    // Resolution is evidence only; the verdict is unaffected
    assert!(result.approve_deposit);
}

#[tokio::test]
async fn test_hanging_resolver_times_out() {
    let timeouts = Timeouts {
        doi_resolution_seconds: 1,
        ..Default::default()
    };
    let detector = detector(
        text_with_doi(),
        FakePipeline::default(),
        FakeResolver::new(ResolverMode::Hang),
    )
    .with_timeouts(timeouts);

    let start = Instant::now();
    let result = detector.detect(&pdf()).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    let resolves = &result.test_results[&TestName::DoiResolvesExtractedText];
    assert!(resolves.outcome.is_indeterminate());
    assert_eq!(
        resolves.diagnostic.as_ref().unwrap().kind,
        DiagnosticKind::NetworkFailure
    );
}

#[tokio::test]
async fn test_no_doi_in_text_skips_resolution() {
    let resolver = FakeResolver::new(ResolverMode::Resolves);
    let source = FakeSource::with_text(article_text(TITLE, "Introduction", 10_000));
    let detector = detector(source, FakePipeline::default(), resolver.clone());

    let result = detector.detect(&pdf()).await.unwrap();

    assert!(result.outcome(TestName::DoiInExtractedText).is_false());
    assert!(!result.test_results.contains_key(&TestName::DoiResolvesExtractedText));
    assert!(resolver.calls().is_empty());
}

//! Matching primitives and reference catalogues used as evidence.
//!
//! Everything here is pure and read-only once constructed, so it can be
//! shared freely between concurrent evaluations.
//!
//! # Example
//!
//! ```ignore
//! use msversion::evidence::{ExpectedWindow, FuzzyMatcher, Query};
//!
//! let matcher = FuzzyMatcher::new(&extracted_text);
//! let title = matcher.search(Query::Literal(&declared_title), 0.1, ExpectedWindow::default())?;
//! ```

pub mod licences;
pub mod logos;
pub mod matcher;
pub mod patterns;
pub mod similarity;

pub use licences::{find_licence, CcLicence, LicenceForm, LicenceMatch, CC_LICENCES};
pub use logos::{
    corroborated_versions, hamming_distance, CatalogueError, DetectedLogo, LogoCatalogue,
    LogoEntry, DEFAULT_MAX_HASH_DISTANCE,
};
pub use matcher::{
    error_budget, normalize_whitespace, search, ExpectedWindow, FuzzyMatcher, MatchError,
    MatchResult, Query, ONE_PAGE_CHARS,
};
pub use patterns::{DOI_PATTERN, PUBLISHER_METADATA_TAGS};
pub use similarity::similarity_ratio;

//! Fixed patterns and vocabularies used by the heuristic tests.

/// DOI-shaped token. Presence only, says nothing about validity.
///
/// Modified from the Crossref recommendation for matching modern DOIs.
pub const DOI_PATTERN: &str = r"10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+";

/// PDF metadata tags only ever written by publisher production systems.
///
/// Any of these with a non-empty value means the file is not an author
/// manuscript.
pub const PUBLISHER_METADATA_TAGS: &[&str] = &[
    "/CrossMarkDomains#5B1#5D",
    "/CrossMarkDomains#5B2#5D",
    "/CrossmarkDomainExclusive",
    "/CrossmarkMajorVersionDate",
    "/doi",
    "/ElsevierWebPDFSpecifications",
    "/Keywords",
];

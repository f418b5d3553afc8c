//! Tunable thresholds and time limits for an evaluation.
//!
//! Both structs deserialize from the `thresholds` and `timeouts` sections of
//! the config file; every field has a default, so partial sections work.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::evidence::{ExpectedWindow, DEFAULT_MAX_HASH_DISTANCE, ONE_PAGE_CHARS};

/// Heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum similarity ratio for a title match (default: 0.9)
    #[serde(default = "default_min_title_similarity")]
    pub min_title_similarity: f64,

    /// Characters in one uninterrupted page of text (default: 2600)
    #[serde(default = "default_one_page_chars")]
    pub one_page_chars: usize,

    /// Pages a journal article is expected to have at least (default: 3)
    #[serde(default = "default_min_pages")]
    pub min_pages: usize,

    /// Edit-error ratio allowed when looking for the title in text (default: 0.1)
    #[serde(default = "default_title_error_ratio")]
    pub title_error_ratio: f64,

    /// Maximum perceptual-hash distance for a logo match (default: 5)
    #[serde(default = "default_max_logo_distance")]
    pub max_logo_distance: u32,
}

fn default_min_title_similarity() -> f64 {
    0.9
}
fn default_one_page_chars() -> usize {
    ONE_PAGE_CHARS
}
fn default_min_pages() -> usize {
    3
}
fn default_title_error_ratio() -> f64 {
    0.1
}
fn default_max_logo_distance() -> u32 {
    DEFAULT_MAX_HASH_DISTANCE
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_title_similarity: default_min_title_similarity(),
            one_page_chars: default_one_page_chars(),
            min_pages: default_min_pages(),
            title_error_ratio: default_title_error_ratio(),
            max_logo_distance: default_max_logo_distance(),
        }
    }
}

impl Thresholds {
    /// Minimum extracted-text length, in chars
    pub fn min_text_length(&self) -> usize {
        self.min_pages * self.one_page_chars
    }

    /// Where a title is expected: the first page
    pub fn first_page(&self) -> ExpectedWindow {
        ExpectedWindow::new(0, self.one_page_chars)
    }
}

/// Limits on calls to external collaborators, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Text/metadata/image extraction (default: 120)
    #[serde(default = "default_extraction_timeout")]
    pub extraction_seconds: u64,

    /// Bibliographic pipeline (default: 300 = 5 min)
    #[serde(default = "default_bibliographic_timeout")]
    pub bibliographic_seconds: u64,

    /// One DOI resolution (default: 30)
    #[serde(default = "default_doi_timeout")]
    pub doi_resolution_seconds: u64,
}

fn default_extraction_timeout() -> u64 {
    120
}
fn default_bibliographic_timeout() -> u64 {
    300
} // 5 min
fn default_doi_timeout() -> u64 {
    30
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            extraction_seconds: default_extraction_timeout(),
            bibliographic_seconds: default_bibliographic_timeout(),
            doi_resolution_seconds: default_doi_timeout(),
        }
    }
}

impl Timeouts {
    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_seconds)
    }

    pub fn bibliographic(&self) -> Duration {
        Duration::from_secs(self.bibliographic_seconds)
    }

    pub fn doi_resolution(&self) -> Duration {
        Duration::from_secs(self.doi_resolution_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.min_text_length(), 7800);
        assert_eq!(thresholds.max_logo_distance, 5);

        let timeouts = Timeouts::default();
        assert_eq!(timeouts.doi_resolution(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_yaml() {
        let thresholds: Thresholds = serde_yaml::from_str("min_pages: 2\n").unwrap();
        assert_eq!(thresholds.min_pages, 2);
        assert_eq!(thresholds.min_title_similarity, 0.9);
        assert_eq!(thresholds.min_text_length(), 5200);
    }
}

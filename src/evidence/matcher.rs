//! Approximate, position-aware substring search over extracted text.
//!
//! # Design Decisions
//!
//! - **Normalize first**: line breaks and whitespace runs collapse to a
//!   single space, otherwise wrapped titles never match
//! - **Case-insensitive**: both sides are compared after lowercasing
//! - **Character offsets**: positions count chars in the normalized text,
//!   not bytes
//! - **Leftmost region, best fit**: the first stretch of text where the
//!   needle occurs within the error budget is chosen, and inside it the
//!   alignment with the fewest edits is returned (earliest start on ties)
//! - **Window is a hint**: `within_expected_window` never filters a match

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters in one printed page of an article, roughly 1300 words
pub const ONE_PAGE_CHARS: usize = 2600;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },
}

impl MatchError {
    fn invalid(reason: impl Into<String>) -> Self {
        MatchError::InvalidQuery {
            reason: reason.into(),
        }
    }
}

/// What to search for
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    /// Every character is literal
    Literal(&'a str),
    /// A regular expression (DOI tokens, licence URLs); exact matches only
    Pattern(&'a str),
}

impl<'a> Query<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Query::Literal(s) | Query::Pattern(s) => s,
        }
    }
}

/// Character span where a match is plausible (e.g. the first page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedWindow {
    pub start: usize,
    pub end: usize,
}

impl ExpectedWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, start: usize, end: usize) -> bool {
        start >= self.start && end <= self.end
    }
}

impl Default for ExpectedWindow {
    fn default() -> Self {
        Self::new(0, ONE_PAGE_CHARS)
    }
}

/// A located match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched text as it appears in the normalized haystack
    pub matched: String,
    /// Char offset range [start, end) in the normalized haystack
    pub start: usize,
    pub end: usize,
    /// Edit operations used
    pub errors: usize,
    pub within_expected_window: bool,
}

/// Normalize whitespace: collapse runs of whitespace (including line breaks) to single space, trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Error budget for a needle: floor(ratio * chars)
pub fn error_budget(needle_chars: usize, max_error_ratio: f64) -> usize {
    (max_error_ratio * needle_chars as f64).floor() as usize
}

/// Searchable, pre-normalized text.
///
/// Building one per document avoids re-normalizing the full text for every
/// query the test suite runs.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    text: String,
    folded: Vec<char>,
}

impl FuzzyMatcher {
    pub fn new(haystack: &str) -> Self {
        let text = normalize_whitespace(haystack);
        let folded = text.chars().map(fold).collect();
        Self { text, folded }
    }

    /// Normalized haystack
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the normalized haystack in chars
    pub fn len(&self) -> usize {
        self.folded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    /// Find the leftmost match of `query` allowing
    /// floor(`max_error_ratio` * len(needle)) edits.
    pub fn search(
        &self,
        query: Query<'_>,
        max_error_ratio: f64,
        window: ExpectedWindow,
    ) -> Result<Option<MatchResult>, MatchError> {
        if query.text().trim().is_empty() {
            return Err(MatchError::invalid("empty needle"));
        }
        if !(0.0..1.0).contains(&max_error_ratio) {
            return Err(MatchError::invalid(format!(
                "error ratio {} outside [0, 1)",
                max_error_ratio
            )));
        }

        let found = match query {
            Query::Pattern(pattern) => {
                if max_error_ratio > 0.0 {
                    return Err(MatchError::invalid(
                        "pattern queries only support exact matching",
                    ));
                }
                self.find_pattern(pattern)?
            }
            Query::Literal(literal) => {
                let needle: Vec<char> = normalize_whitespace(literal).chars().map(fold).collect();
                let budget = error_budget(needle.len(), max_error_ratio);
                if budget == 0 {
                    self.find_exact(&needle)
                } else {
                    self.find_approximate(&needle, budget)
                }
            }
        };

        Ok(found.map(|(start, end, errors)| MatchResult {
            matched: self.slice(start, end),
            start,
            end,
            errors,
            within_expected_window: window.contains(start, end),
        }))
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.text.chars().skip(start).take(end - start).collect()
    }

    fn find_pattern(&self, pattern: &str) -> Result<Option<(usize, usize, usize)>, MatchError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| MatchError::invalid(e.to_string()))?;

        Ok(re.find(&self.text).map(|m| {
            let start = self.text[..m.start()].chars().count();
            let end = start + m.as_str().chars().count();
            (start, end, 0)
        }))
    }

    fn find_exact(&self, needle: &[char]) -> Option<(usize, usize, usize)> {
        if needle.len() > self.folded.len() {
            return None;
        }
        self.folded
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|start| (start, start + needle.len(), 0))
    }

    /// Approximate search in two passes.
    ///
    /// A semi-global (Sellers) pass finds the first text position where some
    /// alignment within `budget` ends. Every start that could reach that
    /// position is then aligned against the needle on its own, and the
    /// cheapest alignment wins.
    fn find_approximate(&self, needle: &[char], budget: usize) -> Option<(usize, usize, usize)> {
        let m = needle.len();
        let first_end = self.first_match_end(needle, budget)?;

        (first_end.saturating_sub(m + budget)..first_end)
            .filter_map(|start| {
                self.align_at(needle, start, budget)
                    .map(|(end, errors)| (start, end, errors))
            })
            .min_by_key(|&(start, end, errors)| (errors, start, (end - start).abs_diff(m)))
    }

    /// End (exclusive) of the earliest-ending alignment within `budget`
    fn first_match_end(&self, needle: &[char], budget: usize) -> Option<usize> {
        let m = needle.len();
        // Cost of needle[..i] ending at the current text position
        let mut prev: Vec<usize> = (0..=m).collect();
        let mut curr = vec![0usize; m + 1];

        for (j, &c) in self.folded.iter().enumerate() {
            curr[0] = 0;
            for i in 1..=m {
                curr[i] = (prev[i - 1] + usize::from(needle[i - 1] != c))
                    .min(prev[i] + 1)
                    .min(curr[i - 1] + 1);
            }
            if curr[m] <= budget {
                return Some(j + 1);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        None
    }

    /// Best alignment of the whole needle against text starting at `start`.
    ///
    /// Returns `(end, errors)`; among equal costs the span closest to the
    /// needle's length is chosen.
    fn align_at(&self, needle: &[char], start: usize, budget: usize) -> Option<(usize, usize)> {
        let m = needle.len();
        let stop = (start + m + budget).min(self.folded.len());
        let text = &self.folded[start..stop];

        // row[k] = edits turning needle[..i] into text[..k]
        let mut prev: Vec<usize> = (0..=text.len()).collect();
        let mut curr = vec![0usize; text.len() + 1];
        for (i, &n) in needle.iter().enumerate() {
            curr[0] = i + 1;
            for k in 1..=text.len() {
                curr[k] = (prev[k - 1] + usize::from(n != text[k - 1]))
                    .min(prev[k] + 1)
                    .min(curr[k - 1] + 1);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        (1..=text.len())
            .map(|k| (prev[k], k.abs_diff(m), k))
            .min()
            .filter(|&(errors, _, _)| errors <= budget)
            .map(|(errors, _, k)| (start + k, errors))
    }
}

/// Convenience wrapper for one-off searches
pub fn search(
    haystack: &str,
    query: Query<'_>,
    max_error_ratio: f64,
    window: ExpectedWindow,
) -> Result<Option<MatchResult>, MatchError> {
    FuzzyMatcher::new(haystack).search(query, max_error_ratio, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(haystack: &str, needle: &str, ratio: f64) -> Option<MatchResult> {
        search(haystack, Query::Literal(needle), ratio, ExpectedWindow::default()).unwrap()
    }

    #[test]
    fn test_exact_is_case_insensitive() {
        let m = find("An Article About Ferns", "article about", 0.0).unwrap();
        assert_eq!(m.matched, "Article About");
        assert_eq!((m.start, m.end), (3, 16));
        assert_eq!(m.errors, 0);
    }

    #[test]
    fn test_exact_rejects_near_miss() {
        assert!(find("An article abut ferns", "article about", 0.0).is_none());
    }

    #[test]
    fn test_fuzzy_allows_budgeted_errors() {
        // 26 chars at 10% => 2 edits allowed
        let haystack = "Intro. Effects of drougth on fern spores. More text.";
        let m = find(haystack, "Effects of drought on fern", 0.1).unwrap();
        assert_eq!(m.matched, "Effects of drougth on fern");
        assert_eq!((m.start, m.end), (7, 33));
        assert_eq!(m.errors, 2);
    }

    #[test]
    fn test_fuzzy_verbatim_occurrence_is_not_clipped() {
        let m = find("zz abcdefghij zz", "abcdefghij", 0.1).unwrap();
        assert_eq!(m.matched, "abcdefghij");
        assert_eq!((m.start, m.end, m.errors), (3, 13, 0));

        let title = "Effects of drought on fern spore germination";
        let haystack = format!("Journal of Plant Studies {} A. Author", title);
        let m = find(&haystack, title, 0.1).unwrap();
        assert_eq!(m.matched, title);
        assert_eq!(m.start, 25);
        assert_eq!(m.errors, 0);
    }

    #[test]
    fn test_fuzzy_prefers_exact_alignment_over_earlier_start() {
        let m = find("Xabcdefghij", "abcdefghij", 0.1).unwrap();
        assert_eq!((m.start, m.end, m.errors), (1, 11, 0));
    }

    #[test]
    fn test_fuzzy_match_crossing_window_edge_is_outside() {
        let title = "Effects of drought on fern spore germination";
        let haystack = format!("{} {} tail", "x".repeat(2559), title);
        let m = find(&haystack, title, 0.1).unwrap();
        assert_eq!((m.start, m.end), (2560, 2604));
        assert_eq!(m.errors, 0);
        assert!(!m.within_expected_window);
    }

    #[test]
    fn test_fuzzy_rejects_over_budget() {
        let haystack = "Completely unrelated words about astronomy";
        assert!(find(haystack, "Effects of drought on fern", 0.1).is_none());
    }

    #[test]
    fn test_line_breaks_are_normalized() {
        let haystack = "Effects of drought\non   fern\n\nspores";
        let m = find(haystack, "effects of drought on fern spores", 0.0).unwrap();
        assert_eq!(m.matched, "Effects of drought on fern spores");
    }

    #[test]
    fn test_special_characters_are_literal() {
        assert!(find("cost is a+b (approx)", "a+b (approx)", 0.0).is_some());
        assert!(find("cost is aab approx", "a+b (approx)", 0.0).is_none());
    }

    #[test]
    fn test_leftmost_match_wins() {
        let m = find("fern x fern", "fern", 0.0).unwrap();
        assert_eq!(m.start, 0);
    }

    #[test]
    fn test_expected_window_flag() {
        let filler = "x".repeat(3000);
        let haystack = format!("{} target phrase here", filler);
        let m = find(&haystack, "target phrase", 0.0).unwrap();
        assert!(!m.within_expected_window);

        let m = find("target phrase first", "target phrase", 0.0).unwrap();
        assert!(m.within_expected_window);
    }

    #[test]
    fn test_empty_needle_is_invalid() {
        let err = search("text", Query::Literal(""), 0.0, ExpectedWindow::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidQuery { .. }));
        let err = search("text", Query::Pattern("  "), 0.0, ExpectedWindow::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidQuery { .. }));
    }

    #[test]
    fn test_pattern_query() {
        let text = "Published as doi:10.1016/j.cell.2019.01.001 in Cell";
        let m = search(
            text,
            Query::Pattern(r"10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+"),
            0.0,
            ExpectedWindow::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(m.matched, "10.1016/j.cell.2019.01.001");
        assert_eq!(m.start, 17);
    }

    #[test]
    fn test_fuzzy_pattern_is_invalid() {
        let err = search("text", Query::Pattern("te.t"), 0.1, ExpectedWindow::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidQuery { .. }));
    }

    #[test]
    fn test_malformed_pattern_is_invalid() {
        let err = search("text", Query::Pattern("(unclosed"), 0.0, ExpectedWindow::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidQuery { .. }));
    }

    #[test]
    fn test_error_budget() {
        assert_eq!(error_budget(26, 0.1), 2);
        assert_eq!(error_budget(9, 0.1), 0);
        assert_eq!(error_budget(50, 0.0), 0);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\nb \t c "), "a b c");
    }

    #[test]
    fn test_offsets_count_chars_not_bytes() {
        let m = find("Ünïcödé title here", "title", 0.0).unwrap();
        assert_eq!(m.start, 8);
        assert_eq!(m.matched, "title");
    }
}

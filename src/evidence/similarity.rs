//! Whole-string similarity based on longest common blocks.
//!
//! ratio = 2 * M / T, where M counts characters in matching blocks found by
//! repeatedly taking the longest common block and recursing on either side,
//! and T is the combined length of both strings. 1.0 means identical.

/// Similarity ratio in [0, 1]; two empty strings are identical
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of a[alo..ahi] and b[blo..bhi].
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j] = length of the common run ending at a[i - 1], b[j - 1]
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut curr = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            if a[i] == b[j] {
                curr[k] = prev[k - 1] + 1;
                if curr[k] > best_size {
                    best_size = curr[k];
                    best_i = i + 1 - best_size;
                    best_j = j + 1 - best_size;
                }
            } else {
                curr[k] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(similarity_ratio("Fern spores", "Fern spores"), 1.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn test_disjoint_strings() {
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_known_ratio() {
        // Longest block "bcd"; the leading "a" is left with nothing to pair => 2 * 3 / 8
        assert!((similarity_ratio("abcd", "bcda") - 0.75).abs() < 1e-9);
        assert!((similarity_ratio("abxcd", "abcd") - 8.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_sensitive() {
        assert!(similarity_ratio("Title", "title") < 1.0);
    }

    #[test]
    fn test_threshold_behaviour() {
        let declared = "Effects of drought on fern spore germination";
        let metadata = "Effects of drought on fern spore germination.";
        assert!(similarity_ratio(declared, metadata) >= 0.9);
        assert!(similarity_ratio(declared, "Supplementary material") < 0.9);
    }
}

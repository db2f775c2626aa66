//! Token-set similarity scoring.
//!
//! Scores follow the classic "token set ratio": both strings are split on
//! whitespace into sets, the shared and unshared tokens are sorted and joined,
//! and the best of three normalized Indel similarities is returned.

use std::collections::BTreeSet;

/// Similarity of two strings in `[0, 100]` based on Indel distance
/// (insertions and deletions only).
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let lensum = a.len() + b.len();
    let dist = lensum - 2 * lcs_len(&a, &b);
    norm_similarity(dist, lensum)
}

/// Token set ratio of two strings in `[0, 100]`.
///
/// Case is not folded here; callers lower-case both sides first.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersect: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One side's tokens are a subset of the other's.
    if !intersect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = diff_ab.join(" ");
    let diff_ba_joined = diff_ba.join(" ");
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();
    let sect_len = intersect.join(" ").chars().count();
    let sep = usize::from(sect_len != 0);

    // Lengths of "sect + diff" for each side, with a joining space only when
    // the intersection is non-empty.
    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    let a_chars: Vec<char> = diff_ab_joined.chars().collect();
    let b_chars: Vec<char> = diff_ba_joined.chars().collect();
    let dist = ab_len + ba_len - 2 * lcs_len(&a_chars, &b_chars);
    let result = norm_similarity(dist, sect_ab_len + sect_ba_len);

    if sect_len == 0 {
        return result;
    }

    // "sect" vs "sect + diff" differ only by the appended suffix.
    let sect_ab_ratio = norm_similarity(sep + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = norm_similarity(sep + ba_len, sect_len + sect_ba_len);

    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

fn norm_similarity(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        return 100.0;
    }
    100.0 - 100.0 * dist as f64 / lensum as f64
}

/// Length of the longest common subsequence, O(|a| * |b|) time, O(|b|) space.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_lcs_len() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(lcs_len(&chars("abcde"), &chars("ace")), 3);
        assert_eq!(lcs_len(&chars("mets"), &chars("yankees")), 2);
        assert_eq!(lcs_len(&chars(""), &chars("abc")), 0);
    }

    #[test]
    fn test_indel_ratio() {
        assert!(approx(indel_ratio("this is a test", "this is a test!"), 96.55));
        assert!(approx(indel_ratio("abc", "abc"), 100.0));
        assert!(approx(indel_ratio("abc", "xyz"), 0.0));
        assert!(approx(indel_ratio("", ""), 100.0));
    }

    #[test]
    fn test_subset_scores_full() {
        assert!(approx(token_set_ratio("fuzzy was a bear", "fuzzy fuzzy was a bear"), 100.0));
        assert!(approx(token_set_ratio("world hello", "hello world"), 100.0));
        assert!(approx(token_set_ratio("hello", "hello there friend"), 100.0));
    }

    #[test]
    fn test_partial_overlap() {
        // sect "new york" vs "new york mets" wins over the diff comparison.
        assert!(approx(token_set_ratio("new york mets", "new york yankees"), 76.19));
    }

    #[test]
    fn test_disjoint_tokens_compare_sorted_strings() {
        let expected = indel_ratio("a b", "c d");
        assert!(approx(token_set_ratio("b a", "d c"), expected));
    }

    #[test]
    fn test_empty_side_scores_zero() {
        assert_eq!(token_set_ratio("", "hello"), 0.0);
        assert_eq!(token_set_ratio("hello", "   "), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let a = "hello how r u";
        let b = "hello, how are you?";
        assert!(approx(token_set_ratio(a, b), token_set_ratio(b, a)));
    }
}

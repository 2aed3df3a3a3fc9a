/// Normalized edit-distance similarity in `[0, 1]`.
///
/// Both strings are case-folded, then `1 - levenshtein / max_len` is
/// returned, with lengths counted in chars. An empty input on either side
/// carries no signal and scores 0, including empty against empty.
pub fn similarity(s: &str, t: &str) -> f64 {
    if s.is_empty() || t.is_empty() {
        return 0.0;
    }

    let s = s.to_lowercase();
    let t = t.to_lowercase();
    let max_len = s.chars().count().max(t.chars().count());
    let distance = strsim::levenshtein(&s, &t);

    1.0 - distance as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_identical_strings_score_one() {
        assert!((similarity("Dune", "Dune") - 1.0).abs() < EPS);
        assert!((similarity("x", "x") - 1.0).abs() < EPS);
    }

    #[test]
    fn test_case_is_folded() {
        assert!((similarity("The Hobbit", "the hobbit") - 1.0).abs() < EPS);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(similarity("Dune", ""), 0.0);
        assert_eq!(similarity("", "Dune"), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("The Great Gatsby", "Great Gatsby"),
            ("abc", "xyz"),
        ];
        for (a, b) in pairs {
            assert!((similarity(a, b) - similarity(b, a)).abs() < EPS);
        }
    }

    #[test]
    fn test_single_insertion() {
        let score = similarity("The Great Gatsby", "The Great Gatsby!");
        assert!((score - (1.0 - 1.0 / 17.0)).abs() < EPS);
        assert!(score > 0.7);
    }

    #[test]
    fn test_classic_kitten_sitting() {
        // distance 3, max length 7
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < EPS);
    }

    #[test]
    fn test_completely_different() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // one substitution over four chars
        assert!((similarity("café", "cafe") - 0.75).abs() < EPS);
    }
}

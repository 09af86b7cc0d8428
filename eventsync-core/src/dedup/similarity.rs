//! Subject similarity for the fuzzy dedup pass.

/// Normalized Levenshtein similarity in `[0, 1]`, case-sensitive.
pub fn subject_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Two subjects name the same event when strictly more similar than `threshold`.
pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    subject_similarity(a, b) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_variant_is_similar() {
        assert!(is_similar("Jazz Night Kiel", "Jazz Night  Kiel", 0.9));
    }

    #[test]
    fn test_different_event_is_not_similar() {
        assert!(!is_similar("Jazz Night Kiel", "Rock Night Kiel", 0.9));
    }

    #[test]
    fn test_similarity_is_case_sensitive() {
        assert!(subject_similarity("JAZZ", "jazz") < 1.0);
        assert_eq!(subject_similarity("Jazz", "Jazz"), 1.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // one edit in ten characters
        assert!(!is_similar("abcdefghij", "abcdefghiX", 0.9));
        assert!(is_similar("abcdefghij", "abcdefghiX", 0.89));
    }
}

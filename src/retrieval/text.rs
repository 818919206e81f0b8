//! Text normalization and similarity helpers shared by scoring and grouping.

use similar::TextDiff;

/// Collapse all whitespace runs to single spaces and trim
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalization used when comparing a query against a snippet:
/// lower-case, punctuation replaced by spaces, whitespace collapsed.
pub fn normalize_for_match(s: &str) -> String {
    let replaced: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    clean_text(&replaced)
}

/// Normalization used when comparing two snippets for near-duplication
pub fn normalize_for_grouping(s: &str) -> String {
    clean_text(&s.to_lowercase())
}

/// Character-sequence similarity ratio in [0, 1]: `2 * matches / (len(a) + len(b))`
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Truncate to at most `max` characters (not bytes)
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\n\tb   c "), "a b c");
    }

    #[test]
    fn test_normalize_for_match_strips_punctuation() {
        assert_eq!(normalize_for_match("Hello, World! (Rust)"), "hello world rust");
        assert_eq!(normalize_for_match("머신러닝: 개요"), "머신러닝 개요");
    }

    #[test]
    fn test_sequence_ratio_bounds() {
        assert_eq!(sequence_ratio("abc", "abc"), 1.0);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
        let r = sequence_ratio("rust language", "rust languages");
        assert!(r > 0.9 && r < 1.0);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}

//! Filename sanitization for note titles and folder names.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Fallback for names that sanitize to nothing.
pub const UNTITLED: &str = "Untitled";

const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turn an arbitrary title into a single safe path component.
///
/// Reserved characters become `-`, control characters are dropped, runs of
/// dashes and whitespace collapse to one space, and names longer than
/// `max_length` characters are cut back to the last word boundary.
pub fn sanitize_filename(name: &str, max_length: usize) -> String {
    let replaced: String = name
        .nfc()
        .filter(|c| !c.is_control())
        .map(|c| if RESERVED.contains(&c) { '-' } else { c })
        .collect();

    let collapsed = SEPARATOR_RUN.replace_all(&replaced, " ");
    let mut sanitized = collapsed.trim().to_string();

    if sanitized.chars().count() > max_length {
        let truncated: String = sanitized.chars().take(max_length).collect();
        sanitized = match truncated.rsplit_once(' ') {
            Some((head, _)) => head.to_string(),
            None => truncated,
        };
    }

    // "." and ".." would point outside the intended folder
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return UNTITLED.to_string();
    }
    sanitized
}

/// Sanitize each folder segment, skipping empty ones.
pub fn sanitize_segments<S: AsRef<str>>(segments: &[S], max_length: usize) -> Vec<String> {
    segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .map(|s| sanitize_filename(s, max_length))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d", 200), "a b c d");
        assert_eq!(sanitize_filename("What? <Really>*", 200), "What Really");
        assert_eq!(sanitize_filename("Q3 | \"Plan\"", 200), "Q3 Plan");
    }

    #[test]
    fn test_control_characters_dropped() {
        assert_eq!(sanitize_filename("tab\there\u{7f}", 200), "tabhere");
        assert_eq!(sanitize_filename("bell\u{7}ring", 200), "bellring");
    }

    #[test]
    fn test_dash_and_space_runs_collapse() {
        assert_eq!(sanitize_filename("  foo -- bar  ", 200), "foo bar");
        assert_eq!(sanitize_filename("2021-01-05 notes", 200), "2021 01 05 notes");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(sanitize_filename("", 200), UNTITLED);
        assert_eq!(sanitize_filename(" -/- ", 200), UNTITLED);
        assert_eq!(sanitize_filename("..", 200), UNTITLED);
    }

    #[test]
    fn test_truncates_at_word_boundary() {
        let title = "word ".repeat(60);
        let out = sanitize_filename(&title, 200);
        assert!(out.chars().count() <= 200);
        assert!(out.ends_with("word"));
        assert!(!out.ends_with(' '));

        let long = "x".repeat(250);
        assert_eq!(sanitize_filename(&long, 200).chars().count(), 200);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let title = "ü".repeat(10);
        assert_eq!(sanitize_filename(&title, 4), "üüüü");
    }

    #[test]
    fn test_nfc_normalization() {
        let decomposed = "Cafe\u{301}";
        assert_eq!(sanitize_filename(decomposed, 200), "Caf\u{e9}");
    }

    #[test]
    fn test_segments() {
        let parents = vec!["Work".to_string(), String::new(), "A/B".to_string()];
        assert_eq!(sanitize_segments(&parents, 200), vec!["Work", "A B"]);
    }
}

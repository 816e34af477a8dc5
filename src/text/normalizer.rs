// file: src/text/normalizer.rs
// description: text cleanup applied before rule matching and vectorization
// reference: lowercase ascii alphanumeric normal form

use crate::text::patterns::{NON_ALPHANUMERIC, WHITESPACE};
use tracing::debug;

/// Lowercases, drops everything outside `[a-z0-9\s]` and collapses whitespace.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let stripped = NON_ALPHANUMERIC.replace_all(&lowered, "");
    let cleaned = WHITESPACE.replace_all(&stripped, " ").trim().to_string();

    debug!(
        "Cleaned text ({} -> {} chars)",
        text.chars().count(),
        cleaned.len()
    );
    cleaned
}

/// Truncates on a char boundary for log previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        assert_eq!(clean_text("Invoice #123, DUE!"), "invoice 123 due");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Pay\n\n\tslip  2024 "), "pay slip 2024");
    }

    #[test]
    fn test_clean_text_drops_non_ascii_letters() {
        assert_eq!(clean_text("Résumé"), "rsum");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("!!!"), "");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo world", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
    }
}

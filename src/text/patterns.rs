// file: src/text/patterns.rs
// description: compiled regex patterns for text cleanup and extraction
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref NON_ALPHANUMERIC: Regex = Regex::new(
        r"[^a-z0-9\s]"
    ).expect("NON_ALPHANUMERIC regex is valid");

    pub static ref WHITESPACE: Regex = Regex::new(
        r"\s+"
    ).expect("WHITESPACE regex is valid");

    // Word paragraph / line break markers inside document.xml
    pub static ref DOCX_BREAK: Regex = Regex::new(
        r"</w:p>|<w:br\s*/>|<w:tab\s*/>"
    ).expect("DOCX_BREAK regex is valid");

    pub static ref XML_TAG: Regex = Regex::new(
        r"<[^>]+>"
    ).expect("XML_TAG regex is valid");
}

/// Common English words that carry no label signal.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "being", "but", "by", "can", "could", "did", "do", "does", "for", "from",
    "had", "has", "have", "he", "her", "here", "him", "his", "how", "if", "in", "into", "is",
    "it", "its", "me", "more", "my", "no", "not", "of", "on", "or", "our", "out", "she", "so",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "to", "up", "us", "was", "we", "were", "what", "when", "which", "who", "will", "with",
    "would", "you", "your",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words_sorted_for_binary_search() {
        let mut sorted = STOP_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOP_WORDS);
    }

    #[test]
    fn test_stop_word_lookup() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("with"));
        assert!(!is_stop_word("invoice"));
    }

    #[test]
    fn test_docx_break_pattern() {
        assert!(DOCX_BREAK.is_match("</w:p>"));
        assert!(DOCX_BREAK.is_match("<w:br/>"));
        assert!(!DOCX_BREAK.is_match("<w:t>"));
    }
}

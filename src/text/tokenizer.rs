// file: src/text/tokenizer.rs
// description: token and n-gram generation over cleaned text
// reference: bag-of-words feature extraction

use crate::text::patterns::is_stop_word;

const MIN_TOKEN_LEN: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tokenizer {
    bigrams: bool,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bigrams(bigrams: bool) -> Self {
        Self { bigrams }
    }

    /// Splits already cleaned text into unigrams, dropping stop words and
    /// very short tokens.
    pub fn tokens<'a>(&self, cleaned: &'a str) -> Vec<&'a str> {
        cleaned
            .split_whitespace()
            .filter(|t| t.len() >= MIN_TOKEN_LEN && !is_stop_word(t))
            .collect()
    }

    /// Unigrams followed by adjacent-pair bigrams when enabled.
    pub fn terms(&self, cleaned: &str) -> Vec<String> {
        let tokens = self.tokens(cleaned);
        let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        if self.bigrams {
            terms.extend(
                tokens
                    .windows(2)
                    .map(|pair| format!("{} {}", pair[0], pair[1])),
            );
        }

        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_filter_stop_words_and_short() {
        let tokenizer = Tokenizer::new();
        assert_eq!(
            tokenizer.tokens("the invoice is a bill for x services"),
            vec!["invoice", "bill", "services"]
        );
    }

    #[test]
    fn test_terms_without_bigrams() {
        let tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.terms("payment due"), vec!["payment", "due"]);
    }

    #[test]
    fn test_terms_with_bigrams() {
        let tokenizer = Tokenizer::with_bigrams(true);
        assert_eq!(
            tokenizer.terms("payment due now"),
            vec!["payment", "due", "now", "payment due", "due now"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(Tokenizer::with_bigrams(true).terms("").is_empty());
    }
}

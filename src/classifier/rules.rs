// file: src/classifier/rules.rs
// description: keyword rule stage of the hybrid classifier
// reference: configurable keyword-to-label classification

use crate::config::ClassificationRule;
use crate::text::clean_text;
use std::collections::HashSet;
use tracing::debug;

/// A rule that fired, with the keywords that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub label: String,
    pub matched_keywords: Vec<String>,
}

struct CompiledRule {
    label: String,
    keywords: Vec<(String, String)>,
    min_matches: usize,
}

/// Matches cleaned text against keyword rules. The rule with the most distinct
/// keyword hits wins; ties keep the rule declared first.
pub struct RuleClassifier {
    rules: Vec<CompiledRule>,
}

impl RuleClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CompiledRule {
                label: rule.label,
                keywords: compile_keywords(rule.keywords),
                min_matches: rule.min_matches.max(1),
            })
            .collect();

        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Expects text already passed through `clean_text`.
    pub fn classify(&self, cleaned: &str) -> Option<RuleMatch> {
        if cleaned.is_empty() {
            return None;
        }

        let haystack = format!(" {} ", cleaned);
        let mut best: Option<(usize, RuleMatch)> = None;

        for rule in &self.rules {
            let matched: Vec<String> = rule
                .keywords
                .iter()
                .filter(|(_, needle)| haystack.contains(needle.as_str()))
                .map(|(keyword, _)| keyword.clone())
                .collect();

            let hits = matched.len();
            if hits < rule.min_matches {
                continue;
            }

            debug!("Rule '{}' matched {} keyword(s)", rule.label, hits);

            let better = best.as_ref().is_none_or(|(top, _)| hits > *top);
            if better {
                best = Some((
                    hits,
                    RuleMatch {
                        label: rule.label.clone(),
                        matched_keywords: matched,
                    },
                ));
            }
        }

        best.map(|(_, m)| m)
    }
}

/// Cleaned, space-padded needles; keywords that clean to the same text count once.
fn compile_keywords(keywords: Vec<String>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .filter_map(|keyword| {
            let cleaned = clean_text(&keyword);
            if cleaned.is_empty() || !seen.insert(cleaned.clone()) {
                return None;
            }
            Some((keyword, format!(" {} ", cleaned)))
        })
        .collect()
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(label: &str, keywords: &[&str], min_matches: usize) -> ClassificationRule {
        ClassificationRule {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            min_matches,
        }
    }

    #[test]
    fn test_single_rule_match() {
        let classifier = RuleClassifier::new(vec![rule("invoice", &["invoice", "bill to"], 1)]);

        let result = classifier.classify("please find the invoice attached").unwrap();
        assert_eq!(result.label, "invoice");
        assert_eq!(result.matched_keywords, vec!["invoice".to_string()]);
    }

    #[test]
    fn test_whole_word_only() {
        let classifier = RuleClassifier::new(vec![rule("tax", &["tax"], 1)]);
        assert!(classifier.classify("taxonomy of plants").is_none());
        assert!(classifier.classify("annual tax return").is_some());
    }

    #[test]
    fn test_phrase_keywords_are_cleaned() {
        let classifier = RuleClassifier::new(vec![rule("invoice", &["Amount Due:"], 1)]);
        assert!(classifier.classify("total amount due 40").is_some());
    }

    #[test]
    fn test_most_hits_wins() {
        let classifier = RuleClassifier::new(vec![
            rule("invoice", &["invoice"], 1),
            rule("contract", &["agreement", "party", "invoice"], 1),
        ]);

        let result = classifier
            .classify("this agreement between each party covers the invoice")
            .unwrap();
        assert_eq!(result.label, "contract");
        assert_eq!(result.matched_keywords.len(), 3);
    }

    #[test]
    fn test_tie_keeps_first_declared() {
        let classifier = RuleClassifier::new(vec![
            rule("invoice", &["payment"], 1),
            rule("receipt", &["payment"], 1),
        ]);

        assert_eq!(classifier.classify("payment received").unwrap().label, "invoice");
    }

    #[test]
    fn test_duplicate_keywords_count_once() {
        let classifier = RuleClassifier::new(vec![
            rule("invoice", &["invoice", "Invoice ", "INVOICE!"], 1),
            rule("receipt", &["invoice", "paid"], 1),
        ]);

        let result = classifier.classify("invoice paid in full").unwrap();
        assert_eq!(result.label, "receipt");
        assert_eq!(result.matched_keywords.len(), 2);

        let result = classifier.classify("invoice attached").unwrap();
        assert_eq!(result.label, "invoice");
        assert_eq!(result.matched_keywords, vec!["invoice".to_string()]);
    }

    #[test]
    fn test_min_matches_threshold() {
        let classifier = RuleClassifier::new(vec![rule("resume", &["experience", "education", "skills"], 2)]);

        assert!(classifier.classify("work experience only").is_none());
        assert!(classifier.classify("education and experience").is_some());
    }

    #[test]
    fn test_no_rules_or_empty_text() {
        let classifier = RuleClassifier::default();
        assert!(classifier.is_empty());
        assert!(classifier.classify("anything").is_none());

        let classifier = RuleClassifier::new(vec![rule("a", &["word"], 1)]);
        assert!(classifier.classify("").is_none());
    }
}

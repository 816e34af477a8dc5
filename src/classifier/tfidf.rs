// file: src/classifier/tfidf.rs
// description: TF-IDF vectorizer with smoothed idf and l2 normalization
// reference: idf(t) = ln((1 + n) / (1 + df(t))) + 1

use crate::config::VectorizerConfig;
use crate::error::{RouterError, Result};
use crate::text::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Sparse feature vector as `(feature index, weight)` pairs sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learns vocabulary and idf weights from cleaned documents.
    pub fn fit(corpus: &[String], config: VectorizerConfig) -> Result<Self> {
        if corpus.is_empty() {
            return Err(RouterError::Model(
                "cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        let tokenizer = Tokenizer::with_bigrams(config.bigrams);
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut term_frequency: HashMap<String, usize> = HashMap::new();

        for document in corpus {
            let terms = tokenizer.terms(document);
            let mut seen: Vec<&String> = terms.iter().collect();
            seen.sort_unstable();
            seen.dedup();

            for term in seen {
                *document_frequency.entry(term.clone()).or_default() += 1;
            }
            for term in terms {
                *term_frequency.entry(term).or_default() += 1;
            }
        }

        let min_df = config.min_df.max(1);
        let mut kept: Vec<(String, usize)> = term_frequency
            .into_iter()
            .filter(|(term, _)| document_frequency.get(term).copied().unwrap_or(0) >= min_df)
            .collect();

        if config.max_features > 0 && kept.len() > config.max_features {
            kept.sort_by(|(a_term, a_tf), (b_term, b_tf)| b_tf.cmp(a_tf).then(a_term.cmp(b_term)));
            kept.truncate(config.max_features);
        }

        let mut terms: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        if terms.is_empty() {
            return Err(RouterError::Model(
                "vectorizer vocabulary is empty after filtering".to_string(),
            ));
        }

        let n = corpus.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect::<HashMap<_, _>>();

        debug!("Fitted vectorizer with {} terms", vocabulary.len());

        Ok(Self {
            config,
            vocabulary,
            idf,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, index: usize) -> Option<f64> {
        self.idf.get(index).copied()
    }

    /// Projects cleaned text into the fitted feature space.
    pub fn transform(&self, cleaned: &str) -> SparseVector {
        let tokenizer = Tokenizer::with_bigrams(self.config.bigrams);
        let mut counts: HashMap<usize, f64> = HashMap::new();

        for term in tokenizer.terms(cleaned) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.config.sublinear_tf {
                    1.0 + tf.ln()
                } else {
                    tf
                };
                (index, tf * self.idf[index])
            })
            .collect();
        vector.sort_unstable_by_key(|(index, _)| *index);

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in vector.iter_mut() {
                *weight /= norm;
            }
        }

        vector
    }

    pub fn transform_dense(&self, cleaned: &str) -> Vec<f64> {
        let mut dense = vec![0.0; self.vocabulary_size()];
        for (index, weight) in self.transform(cleaned) {
            dense[index] = weight;
        }
        dense
    }
}

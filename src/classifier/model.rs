// file: src/classifier/model.rs
// description: trained statistical classifier (tf-idf features + random forest)
// reference: persisted as json with serde_json

use crate::classifier::forest::RandomForest;
use crate::classifier::tfidf::TfidfVectorizer;
use crate::config::{ForestConfig, VectorizerConfig};
use crate::error::{RouterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// One labelled, already cleaned training document.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub label: String,
    pub text: String,
}

impl TrainingSample {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierModel {
    labels: Vec<String>,
    vectorizer: TfidfVectorizer,
    forest: RandomForest,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
}

impl ClassifierModel {
    pub fn train(
        samples: &[TrainingSample],
        vectorizer_config: VectorizerConfig,
        forest_config: &ForestConfig,
    ) -> Result<Self> {
        let labels: Vec<String> = samples
            .iter()
            .map(|s| s.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if labels.len() < 2 {
            return Err(RouterError::Model(format!(
                "training needs at least two labels, found {}",
                labels.len()
            )));
        }

        let corpus: Vec<String> = samples.iter().map(|s| s.text.clone()).collect();
        let vectorizer = TfidfVectorizer::fit(&corpus, vectorizer_config)?;

        let features: Vec<Vec<f64>> = corpus
            .iter()
            .map(|text| vectorizer.transform_dense(text))
            .collect();
        let targets: Vec<usize> = samples
            .iter()
            .map(|s| labels.binary_search(&s.label).unwrap_or_default())
            .collect();

        let forest = RandomForest::fit(&features, &targets, labels.len(), forest_config)?;

        info!(
            "Trained classifier on {} samples across {} labels ({} terms)",
            samples.len(),
            labels.len(),
            vectorizer.vocabulary_size()
        );

        Ok(Self {
            labels,
            vectorizer,
            forest,
            trained_at: Utc::now(),
            training_samples: samples.len(),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    /// `None` when the text shares no terms with the vocabulary.
    pub fn predict(&self, cleaned: &str) -> Option<Prediction> {
        let sparse = self.vectorizer.transform(cleaned);
        if sparse.is_empty() {
            return None;
        }

        let mut dense = vec![0.0; self.vectorizer.vocabulary_size()];
        for (index, weight) in sparse {
            dense[index] = weight;
        }

        let (index, confidence) = self.forest.predict(&dense);
        Some(Prediction {
            label: self.labels[index].clone(),
            confidence,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| RouterError::FileOperation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string(self)?;
        fs::write(path, json).map_err(|source| RouterError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Saved classifier model to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| RouterError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_str(&json)?;

        if model.forest.n_classes() != model.labels.len()
            || model.forest.n_features() != model.vectorizer.vocabulary_size()
        {
            return Err(RouterError::Model(format!(
                "model file {} is inconsistent",
                path.display()
            )));
        }

        Ok(model)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn training_samples() -> Vec<TrainingSample> {
        let invoices = [
            "invoice number payment due total amount",
            "invoice amount due payment terms net",
            "tax invoice total payable amount",
            "payment due invoice balance",
        ];
        let resumes = [
            "resume experience education skills",
            "curriculum vitae education experience references",
            "professional experience skills university degree",
            "resume skills employment history education",
        ];

        invoices
            .iter()
            .map(|t| TrainingSample::new("invoice", *t))
            .chain(resumes.iter().map(|t| TrainingSample::new("resume", *t)))
            .collect()
    }

    pub(crate) fn trained_model() -> ClassifierModel {
        ClassifierModel::train(
            &training_samples(),
            VectorizerConfig::default(),
            &ForestConfig {
                n_trees: 30,
                max_depth: 8,
                min_samples_split: 2,
                seed: 11,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_labels_sorted() {
        let model = trained_model();
        assert_eq!(model.labels(), &["invoice".to_string(), "resume".to_string()]);
        assert_eq!(model.training_samples, 8);
    }

    #[test]
    fn test_predicts_training_domain() {
        let model = trained_model();

        let prediction = model.predict("invoice payment due").unwrap();
        assert_eq!(prediction.label, "invoice");
        assert!(prediction.confidence > 0.5);

        let prediction = model.predict("education experience skills").unwrap();
        assert_eq!(prediction.label, "resume");
    }

    #[test]
    fn test_unknown_vocabulary_has_no_prediction() {
        let model = trained_model();
        assert!(model.predict("zebra giraffe").is_none());
        assert!(model.predict("").is_none());
    }

    #[test]
    fn test_requires_two_labels() {
        let samples = vec![
            TrainingSample::new("invoice", "invoice total"),
            TrainingSample::new("invoice", "invoice due"),
        ];
        let result = ClassifierModel::train(
            &samples,
            VectorizerConfig::default(),
            &ForestConfig::default(),
        );
        assert!(matches!(result, Err(RouterError::Model(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("models/model.json");

        let model = trained_model();
        model.save(&path).unwrap();

        let loaded = ClassifierModel::load(&path).unwrap();
        assert_eq!(loaded.labels(), model.labels());
        let before = model.predict("invoice payment due").unwrap();
        let after = loaded.predict("invoice payment due").unwrap();
        assert_eq!(after.label, before.label);
        assert!((after.confidence - before.confidence).abs() < 1e-9);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ClassifierModel::load(Path::new("/nonexistent/model.json"));
        assert!(matches!(result, Err(RouterError::FileOperation { .. })));
    }
}

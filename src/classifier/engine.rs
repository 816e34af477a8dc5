// file: src/classifier/engine.rs
// description: hybrid classifier combining keyword rules with the trained model
// reference: rules first, model second, fallback label when neither is decisive

use crate::classifier::model::ClassifierModel;
use crate::classifier::rules::RuleClassifier;
use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::models::Classification;
use crate::text::clean_text;
use tracing::{debug, info, warn};

pub struct HybridClassifier {
    rules: RuleClassifier,
    model: Option<ClassifierModel>,
    threshold: f64,
    fallback_label: String,
}

impl HybridClassifier {
    pub fn new(
        rules: RuleClassifier,
        model: Option<ClassifierModel>,
        threshold: f64,
        fallback_label: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            model,
            threshold,
            fallback_label: fallback_label.into(),
        }
    }

    /// Builds from configuration, loading the model file when it exists.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let rules = RuleClassifier::new(config.rules.clone());

        let model = if config.model_path.exists() {
            let model = ClassifierModel::load(&config.model_path)?;
            info!(
                "Loaded classifier model from {} ({} labels)",
                config.model_path.display(),
                model.labels().len()
            );
            Some(model)
        } else {
            warn!(
                "No model at {}, classifying with rules only",
                config.model_path.display()
            );
            None
        };

        Ok(Self::new(
            rules,
            model,
            config.confidence_threshold,
            config.fallback_label.clone(),
        ))
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn fallback_label(&self) -> &str {
        &self.fallback_label
    }

    pub fn classify(&self, text: &str) -> Classification {
        let cleaned = clean_text(text);
        self.classify_cleaned(&cleaned)
    }

    pub fn classify_cleaned(&self, cleaned: &str) -> Classification {
        if cleaned.is_empty() {
            return Classification::fallback(&self.fallback_label, 0.0);
        }

        if let Some(rule_match) = self.rules.classify(cleaned) {
            debug!(
                "Rule match '{}' via {:?}",
                rule_match.label, rule_match.matched_keywords
            );
            return Classification::from_rule(rule_match.label, rule_match.matched_keywords);
        }

        let Some(model) = &self.model else {
            return Classification::fallback(&self.fallback_label, 0.0);
        };

        match model.predict(cleaned) {
            Some(prediction) if prediction.confidence >= self.threshold => {
                Classification::from_model(prediction.label, prediction.confidence)
            }
            Some(prediction) => {
                debug!(
                    "Model guess '{}' at {:.2} below threshold {:.2}",
                    prediction.label, prediction.confidence, self.threshold
                );
                Classification::fallback(&self.fallback_label, prediction.confidence)
            }
            None => Classification::fallback(&self.fallback_label, 0.0),
        }
    }
}

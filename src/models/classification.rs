// file: src/models/classification.rs
// description: classification outcome produced by the hybrid engine
// reference: internal data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage of the hybrid engine produced the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    Rule,
    Model,
    Fallback,
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassificationMethod::Rule => "rule",
            ClassificationMethod::Model => "model",
            ClassificationMethod::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
    pub method: ClassificationMethod,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
}

impl Classification {
    pub fn from_rule(label: impl Into<String>, matched_keywords: Vec<String>) -> Self {
        Self {
            label: label.into(),
            confidence: 1.0,
            method: ClassificationMethod::Rule,
            matched_keywords,
        }
    }

    pub fn from_model(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method: ClassificationMethod::Model,
            matched_keywords: Vec::new(),
        }
    }

    pub fn fallback(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method: ClassificationMethod::Fallback,
            matched_keywords: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_classification_is_certain() {
        let c = Classification::from_rule("invoice", vec!["invoice".to_string()]);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.method, ClassificationMethod::Rule);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Classification::from_model("a", 1.2).confidence, 1.0);
        assert_eq!(Classification::fallback("a", -0.1).confidence, 0.0);
    }

    #[test]
    fn test_method_serializes_lowercase() {
        let json = serde_json::to_string(&ClassificationMethod::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
    }
}

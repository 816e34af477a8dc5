// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{RouterError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub intake: IntakeConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub classifier: ClassifierConfig,
    pub routing: RoutingConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    pub inbox_dir: PathBuf,
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    pub max_file_size_mb: usize,
    #[serde(default)]
    pub force_reprocess: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub maildrop_dir: PathBuf,
    pub staging_dir: PathBuf,
    /// Mailbox address; when set only messages addressed to it are accepted.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// Settings handed to the external OCR tools.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub ocr_language: String,
    pub ocr_max_pages: u32,
    pub ocr_dpi: u32,
    /// Resolution of the single-page retry when page OCR comes back empty.
    pub ocr_fallback_dpi: u32,
    /// Downscale, grayscale and binarize images before tesseract sees them.
    pub ocr_preprocess: bool,
    pub ocr_render_timeout_secs: u64,
    pub ocr_page_timeout_secs: u64,
    pub ocr_attempt_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_language: "eng".to_string(),
            ocr_max_pages: 3,
            ocr_dpi: 150,
            ocr_fallback_dpi: 100,
            ocr_preprocess: true,
            ocr_render_timeout_secs: 60,
            ocr_page_timeout_secs: 30,
            ocr_attempt_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
    pub model_path: PathBuf,
    pub training_dir: PathBuf,
    pub confidence_threshold: f64,
    pub fallback_label: String,
    pub vectorizer: VectorizerConfig,
    pub forest: ForestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClassificationRule {
    pub label: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,
}

fn default_min_matches() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VectorizerConfig {
    pub min_df: usize,
    pub max_features: usize,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub bigrams: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    pub output_root: PathBuf,
    #[serde(default)]
    pub routes: HashMap<String, String>,
    #[serde(default)]
    pub move_files: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub parallel_workers: usize,
    pub ledger_path: PathBuf,
    pub extraction_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            min_df: 1,
            max_features: 5000,
            sublinear_tf: false,
            bigrams: false,
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 12,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DOC_ROUTER")
                .separator("__")
                .try_parsing(true),
        );

        // Mailbox credentials keep their conventional unprefixed names.
        builder = builder
            .set_override_option("email.user", std::env::var("EMAIL_USER").ok())
            .and_then(|b| b.set_override_option("email.password", std::env::var("EMAIL_PASS").ok()))
            .map_err(|e| RouterError::Config(e.to_string()))?;

        let settings = builder
            .build()
            .map_err(|e| RouterError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| RouterError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            intake: IntakeConfig {
                inbox_dir: PathBuf::from("./data/inbox"),
                skip_patterns: vec![".git/*".to_string(), "*.tmp".to_string()],
                max_file_size_mb: 25,
                force_reprocess: false,
            },
            email: EmailConfig {
                enabled: true,
                maildrop_dir: PathBuf::from("./data/maildrop"),
                staging_dir: PathBuf::from("./data/staging"),
                user: None,
                password: None,
            },
            extraction: ExtractionConfig::default(),
            classifier: ClassifierConfig {
                rules: vec![],
                model_path: PathBuf::from("./data/model.json"),
                training_dir: PathBuf::from("./data/training"),
                confidence_threshold: 0.5,
                fallback_label: "uncategorized".to_string(),
                vectorizer: VectorizerConfig::default(),
                forest: ForestConfig::default(),
            },
            routing: RoutingConfig {
                output_root: PathBuf::from("./data/sorted"),
                routes: HashMap::new(),
                move_files: false,
            },
            pipeline: PipelineConfig {
                parallel_workers: 4,
                ledger_path: PathBuf::from("./data/ledger.jsonl"),
                extraction_timeout_secs: 60,
                poll_interval_secs: 900,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.parallel_workers == 0 {
            return Err(RouterError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.poll_interval_secs == 0 {
            return Err(RouterError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        let threshold = self.classifier.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RouterError::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.classifier.fallback_label.trim().is_empty() {
            return Err(RouterError::Config(
                "fallback_label must not be empty".to_string(),
            ));
        }

        for rule in &self.classifier.rules {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(RouterError::Config(format!(
                    "rule for label '{}' has no keywords",
                    rule.label
                )));
            }
        }

        if self.pipeline.extraction_timeout_secs == 0 {
            return Err(RouterError::Config(
                "extraction_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let extraction = &self.extraction;
        for (key, value) in [
            ("ocr_max_pages", u64::from(extraction.ocr_max_pages)),
            ("ocr_dpi", u64::from(extraction.ocr_dpi)),
            ("ocr_fallback_dpi", u64::from(extraction.ocr_fallback_dpi)),
            ("ocr_render_timeout_secs", extraction.ocr_render_timeout_secs),
            ("ocr_page_timeout_secs", extraction.ocr_page_timeout_secs),
            ("ocr_attempt_timeout_secs", extraction.ocr_attempt_timeout_secs),
        ] {
            if value == 0 {
                return Err(RouterError::Config(format!(
                    "extraction.{} must be greater than 0",
                    key
                )));
            }
        }

        if self.classifier.forest.n_trees == 0 {
            return Err(RouterError::Config(
                "forest.n_trees must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = Config::default_config();
        config.classifier.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = Config::default_config();
        config.pipeline.extraction_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(RouterError::Config(m)) if m.contains("extraction_timeout_secs")));

        let mut config = Config::default_config();
        config.extraction.ocr_page_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_extraction_section_uses_defaults() {
        let extraction: ExtractionConfig =
            serde_json::from_str(r#"{"ocr_language": "deu"}"#).unwrap();
        assert_eq!(extraction.ocr_language, "deu");
        assert_eq!(extraction.ocr_fallback_dpi, 100);
        assert!(extraction.ocr_preprocess);
    }

    #[test]
    fn test_rejects_rule_without_keywords() {
        let mut config = Config::default_config();
        config.classifier.rules.push(ClassificationRule {
            label: "invoice".to_string(),
            keywords: vec!["  ".to_string()],
            min_matches: 1,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let config = Config::load(Some(&path)).unwrap();

        assert!(!config.classifier.rules.is_empty());
        assert_eq!(config.pipeline.poll_interval_secs, 900);
        assert_eq!(
            config.routing.routes.get("invoice").map(String::as_str),
            Some("finance/invoices")
        );
    }

    #[test]
    fn test_load_from_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[intake]
inbox_dir = "inbox"
max_file_size_mb = 5

[email]
enabled = false
maildrop_dir = "maildrop"
staging_dir = "staging"

[classifier]
model_path = "model.json"
training_dir = "training"
confidence_threshold = 0.6
fallback_label = "other"

[[classifier.rules]]
label = "invoice"
keywords = ["invoice", "amount due"]

[classifier.vectorizer]
min_df = 2
max_features = 100

[classifier.forest]
n_trees = 10
max_depth = 6
min_samples_split = 2
seed = 7

[routing]
output_root = "sorted"

[routing.routes]
invoice = "finance/invoices"

[pipeline]
parallel_workers = 2
ledger_path = "ledger.jsonl"
extraction_timeout_secs = 30
poll_interval_secs = 900
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.classifier.rules.len(), 1);
        assert_eq!(config.classifier.rules[0].min_matches, 1);
        assert_eq!(config.classifier.fallback_label, "other");
        assert_eq!(
            config.routing.routes.get("invoice"),
            Some(&"finance/invoices".to_string())
        );
        assert_eq!(config.classifier.forest.n_trees, 10);
    }
}

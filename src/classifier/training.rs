// file: src/classifier/training.rs
// description: labelled corpus loading, hold-out evaluation and metrics
// reference: https://docs.rs/walkdir

use crate::classifier::model::{ClassifierModel, TrainingSample};
use crate::config::{ForestConfig, VectorizerConfig};
use crate::error::{RouterError, Result};
use crate::extract::ExtractorRegistry;
use crate::text::clean_text;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Reads `<root>/<label>/<file>` into cleaned samples, sorted by label then path.
pub fn load_training_dir(root: &Path, registry: &ExtractorRegistry) -> Result<Vec<TrainingSample>> {
    if !root.is_dir() {
        return Err(RouterError::Validation(format!(
            "Training directory does not exist: {}",
            root.display()
        )));
    }

    let mut entries: Vec<(String, std::path::PathBuf)> = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(2)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !registry.supports(entry.path()) {
            continue;
        }

        let label = entry
            .path()
            .strip_prefix(root)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|c| c.as_os_str().to_string_lossy().to_string());

        if let Some(label) = label {
            entries.push((label, entry.path().to_path_buf()));
        }
    }

    entries.sort();

    let mut samples = Vec::with_capacity(entries.len());
    for (label, path) in entries {
        match registry.extract(&path) {
            Ok(text) => {
                let cleaned = clean_text(&text);
                if cleaned.is_empty() {
                    debug!("Skipping {} (no usable text)", path.display());
                    continue;
                }
                samples.push(TrainingSample::new(label, cleaned));
            }
            Err(e) => warn!("Skipping training file {}: {}", path.display(), e),
        }
    }

    info!(
        "Loaded {} training samples from {}",
        samples.len(),
        root.display()
    );
    Ok(samples)
}

/// Deterministic per-label split: the last `ceil(n * ratio)` samples of each
/// label are held out, keeping at least one per label for training.
pub fn split_holdout(
    samples: &[TrainingSample],
    test_ratio: f64,
) -> (Vec<TrainingSample>, Vec<TrainingSample>) {
    let ratio = test_ratio.clamp(0.0, 1.0);
    let mut by_label: BTreeMap<&str, Vec<&TrainingSample>> = BTreeMap::new();
    for sample in samples {
        by_label.entry(sample.label.as_str()).or_default().push(sample);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();

    for group in by_label.values() {
        let held = ((group.len() as f64) * ratio).ceil() as usize;
        let held = held.min(group.len().saturating_sub(1));
        let cut = group.len() - held;

        train.extend(group[..cut].iter().map(|s| (*s).clone()));
        test.extend(group[cut..].iter().map(|s| (*s).clone()));
    }

    (train, test)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub labels: Vec<String>,
    pub total: usize,
    pub correct: usize,
    pub unpredicted: usize,
    /// `confusion[actual][predicted]` over `labels` order
    pub confusion: Vec<Vec<usize>>,
    pub per_label: BTreeMap<String, LabelMetrics>,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    pub fn format(&self) -> String {
        let mut output = format!(
            "Accuracy: {:.2}% ({}/{}), {} without prediction\n\n",
            self.accuracy() * 100.0,
            self.correct,
            self.total,
            self.unpredicted
        );

        output.push_str(&format!(
            "{:<24} {:>9} {:>9} {:>8}\n",
            "label", "precision", "recall", "support"
        ));
        for (label, metrics) in &self.per_label {
            output.push_str(&format!(
                "{:<24} {:>9.3} {:>9.3} {:>8}\n",
                label, metrics.precision, metrics.recall, metrics.support
            ));
        }

        output.push('\n');
        output.push_str(&self.format_confusion());
        output
    }

    /// Rows are actual labels, columns predicted labels.
    pub fn format_confusion(&self) -> String {
        let width = self
            .labels
            .iter()
            .map(|l| l.len())
            .chain(self.confusion.iter().flatten().map(|c| c.to_string().len()))
            .max()
            .unwrap_or(0)
            .max(6);

        let mut output = String::from("Confusion matrix (rows: actual, columns: predicted)\n");
        output.push_str(&format!("{:<width$}", "", width = width));
        for label in &self.labels {
            output.push_str(&format!(" {:>width$}", label, width = width));
        }
        output.push('\n');

        for (label, row) in self.labels.iter().zip(&self.confusion) {
            output.push_str(&format!("{:<width$}", label, width = width));
            for count in row {
                output.push_str(&format!(" {:>width$}", count, width = width));
            }
            output.push('\n');
        }

        output
    }
}

/// Scores a model against held-out samples. Labels unknown to the model and
/// texts without known terms count as misses.
pub fn evaluate(model: &ClassifierModel, samples: &[TrainingSample]) -> EvaluationReport {
    let labels = model.labels().to_vec();
    let n = labels.len();
    let mut confusion = vec![vec![0usize; n]; n];
    let mut correct = 0;
    let mut unpredicted = 0;
    let mut support = vec![0usize; n];

    for sample in samples {
        let actual = labels.iter().position(|l| *l == sample.label);
        if let Some(actual) = actual {
            support[actual] += 1;
        }

        let Some(prediction) = model.predict(&sample.text) else {
            unpredicted += 1;
            continue;
        };

        let predicted = labels.iter().position(|l| *l == prediction.label);
        if let (Some(actual), Some(predicted)) = (actual, predicted) {
            confusion[actual][predicted] += 1;
            if actual == predicted {
                correct += 1;
            }
        }
    }

    let per_label = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let true_positive = confusion[i][i] as f64;
            let predicted_as: usize = confusion.iter().map(|row| row[i]).sum();
            let precision = if predicted_as == 0 {
                0.0
            } else {
                true_positive / predicted_as as f64
            };
            let recall = if support[i] == 0 {
                0.0
            } else {
                true_positive / support[i] as f64
            };

            (
                label.clone(),
                LabelMetrics {
                    precision,
                    recall,
                    support: support[i],
                },
            )
        })
        .collect();

    EvaluationReport {
        labels,
        total: samples.len(),
        correct,
        unpredicted,
        confusion,
        per_label,
    }
}

/// Trains on the split's training half and evaluates on the rest.
pub fn train_and_evaluate(
    samples: &[TrainingSample],
    test_ratio: f64,
    vectorizer: VectorizerConfig,
    forest: &ForestConfig,
) -> Result<EvaluationReport> {
    let (train, test) = split_holdout(samples, test_ratio);
    if test.is_empty() {
        return Err(RouterError::Validation(
            "hold-out split left no evaluation samples".to_string(),
        ));
    }

    let model = ClassifierModel::train(&train, vectorizer, forest)?;
    Ok(evaluate(&model, &test))
}

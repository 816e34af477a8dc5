// file: src/models/stats.rs
// description: Aggregated counts over processed documents for reporting
// reference: Feeds the stats command and dashboard exports

use crate::models::{Document, DocumentStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelStats {
    /// Total documents seen
    pub total: usize,

    /// Documents per assigned label
    pub by_label: BTreeMap<String, usize>,

    /// Documents per arrival source ("upload" / "email")
    pub by_source: BTreeMap<String, usize>,

    /// Documents per classification method
    pub by_method: BTreeMap<String, usize>,

    /// Documents per lifecycle status
    pub by_status: BTreeMap<String, usize>,
}

impl LabelStats {
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut stats = Self::default();
        for document in documents {
            stats.record(document);
        }
        stats
    }

    pub fn record(&mut self, document: &Document) {
        self.total += 1;
        *self
            .by_source
            .entry(document.source.kind().to_string())
            .or_default() += 1;
        *self
            .by_status
            .entry(document.status.to_string())
            .or_default() += 1;

        if let Some(classification) = &document.classification {
            *self
                .by_label
                .entry(classification.label.clone())
                .or_default() += 1;
            *self
                .by_method
                .entry(classification.method.to_string())
                .or_default() += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.by_status
            .get(&DocumentStatus::Failed.to_string())
            .copied()
            .unwrap_or(0)
    }

    /// Format as a multi-line summary for display
    pub fn format(&self) -> String {
        let mut output = format!("Total documents: {}\n", self.total);

        for (title, map) in [
            ("Labels", &self.by_label),
            ("Sources", &self.by_source),
            ("Methods", &self.by_method),
            ("Status", &self.by_status),
        ] {
            if map.is_empty() {
                continue;
            }
            output.push_str(&format!("\n{}:\n", title));
            for (key, count) in map {
                output.push_str(&format!("  {:<24} {}\n", key, count));
            }
        }

        output
    }
}

// file: src/exporter/json.rs
// description: json export of ledger documents with a manifest

use crate::error::Result;
use crate::models::{Document, LabelStats};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DOCUMENTS_FILE: &str = "documents.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub label_filter: Option<String>,
    pub total_documents: usize,
    pub stats: LabelStats,
    pub files: Vec<String>,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `documents.json` and `manifest.json`, keeping only documents
    /// carrying `label` when one is given.
    pub fn export(
        &self,
        documents: &[&Document],
        label: Option<&str>,
        pretty: bool,
    ) -> Result<ExportManifest> {
        info!("Starting JSON export to {:?}", self.output_dir);

        let selected: Vec<&Document> = documents
            .iter()
            .copied()
            .filter(|d| label.is_none_or(|l| d.label() == Some(l)))
            .collect();

        self.write_json(DOCUMENTS_FILE, &selected, pretty)?;

        let manifest = ExportManifest {
            exported_at: Utc::now().to_rfc3339(),
            label_filter: label.map(|l| l.to_string()),
            total_documents: selected.len(),
            stats: LabelStats::from_documents(selected.iter().copied()),
            files: vec![DOCUMENTS_FILE.to_string(), MANIFEST_FILE.to_string()],
        };
        self.write_json(MANIFEST_FILE, &manifest, pretty)?;

        info!(
            "Export complete: {} documents exported",
            manifest.total_documents
        );
        Ok(manifest)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        fs::write(self.output_dir.join(name), json)?;
        Ok(())
    }
}

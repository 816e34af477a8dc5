// file: src/store/ledger.rs
// description: append-only JSON lines record of processed documents
// reference: https://jsonlines.org

use crate::error::{RouterError, Result};
use crate::models::{Document, DocumentStatus, LabelStats};
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of checking routed entries against the filesystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerCheck {
    pub routed: usize,
    pub missing: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl LedgerCheck {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.modified.is_empty()
    }
}

pub struct Ledger {
    path: PathBuf,
    entries: Vec<Document>,
}

impl Ledger {
    /// Reads every entry of an existing ledger. A missing file is an empty
    /// ledger; unparseable lines are skipped with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = Vec::new();

        if path.exists() {
            let file = fs::File::open(&path).map_err(|source| RouterError::FileOperation {
                path: path.clone(),
                source,
            })?;

            for (number, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Document>(&line) {
                    Ok(document) => entries.push(document),
                    Err(e) => warn!(
                        "Skipping malformed ledger line {} in {}: {}",
                        number + 1,
                        path.display(),
                        e
                    ),
                }
            }
            info!("Loaded {} ledger entries from {}", entries.len(), path.display());
        } else {
            debug!("Ledger {} does not exist yet", path.display());
        }

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, document: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| RouterError::FileOperation {
                path: self.path.clone(),
                source,
            })?;

        let line = serde_json::to_string(document)?;
        writeln!(file, "{}", line)?;
        file.flush()?;

        self.entries.push(document.clone());
        Ok(())
    }

    /// The most recent entry for each content hash, in first-seen order.
    pub fn documents(&self) -> Vec<&Document> {
        let mut latest: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for (index, document) in self.entries.iter().enumerate() {
            let hash = document.content_hash.as_str();
            if latest.insert(hash, index).is_none() {
                order.push(hash);
            }
        }

        order
            .into_iter()
            .map(|hash| &self.entries[latest[hash]])
            .collect()
    }

    /// Hashes whose latest entry was routed successfully. Failed documents
    /// are not included so they are retried on the next pass.
    pub fn known_hashes(&self) -> HashSet<String> {
        self.documents()
            .into_iter()
            .filter(|d| d.status == DocumentStatus::Routed)
            .map(|d| d.content_hash.clone())
            .collect()
    }

    pub fn stats(&self) -> LabelStats {
        LabelStats::from_documents(self.documents())
    }

    /// Confirms every routed file still exists with its recorded hash.
    pub fn check_routed(&self) -> Result<LedgerCheck> {
        let mut check = LedgerCheck::default();

        for document in self.documents() {
            let Some(destination) = &document.routed_to else {
                continue;
            };
            check.routed += 1;

            if !destination.exists() {
                check.missing.push(destination.clone());
                continue;
            }

            let bytes = fs::read(destination).map_err(|source| RouterError::FileOperation {
                path: destination.clone(),
                source,
            })?;
            if Document::compute_hash(&bytes) != document.content_hash {
                check.modified.push(destination.clone());
            }
        }

        Ok(check)
    }
}

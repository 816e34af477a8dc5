// file: src/routing/router.rs
// description: places classified documents into per-label folders
// reference: https://doc.rust-lang.org/std/fs/

use crate::config::RoutingConfig;
use crate::error::{RouterError, Result};
use crate::models::{Document, DocumentSource};
use crate::utils::files::create_unique;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Folder-safe form of a label: ASCII alphanumerics, `-` and `_` survive,
/// everything else becomes `_`.
pub fn sanitize_label(label: &str) -> String {
    let folder: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    let folder = folder.trim_matches('_');
    if folder.is_empty() {
        "_".to_string()
    } else {
        folder.to_string()
    }
}

pub struct DocumentRouter {
    config: RoutingConfig,
}

impl DocumentRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn folder_for(&self, label: &str) -> PathBuf {
        match self.config.routes.get(label) {
            Some(folder) => self.config.output_root.join(folder),
            None => self.config.output_root.join(sanitize_label(label)),
        }
    }

    /// Copies the document's file into its label folder and returns the
    /// destination. Staged email attachments are always removed afterwards,
    /// upload originals only when `move_files` is set.
    pub fn route(&self, document: &Document) -> Result<PathBuf> {
        let label = document.label().ok_or_else(|| {
            RouterError::Routing(format!("{} has no classification", document.file_name))
        })?;

        let folder = self.folder_for(label);
        fs::create_dir_all(&folder).map_err(|source| RouterError::FileOperation {
            path: folder.clone(),
            source,
        })?;

        let source_path = &document.original_path;
        let destination = self.copy_into(&folder, document)?;
        debug!(
            "Copied {} -> {}",
            source_path.display(),
            destination.display()
        );

        let remove_source = match document.source {
            DocumentSource::Upload => self.config.move_files,
            DocumentSource::Email { .. } => true,
        };
        if remove_source {
            fs::remove_file(source_path).map_err(|source| RouterError::FileOperation {
                path: source_path.clone(),
                source,
            })?;
        }

        info!("Routed {} to {}", document.file_name, folder.display());
        Ok(destination)
    }

    /// Claims a free name in `folder` with `create_new` and streams the file
    /// into it. Same-named documents get a `-<hash8>` suffix.
    fn copy_into(&self, folder: &Path, document: &Document) -> Result<PathBuf> {
        let name = Path::new(&document.file_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| document.content_hash.clone());
        let short_hash: String = document.content_hash.chars().take(8).collect();

        let (destination, mut target) =
            create_unique(folder, &name, &short_hash).map_err(|source| {
                RouterError::FileOperation {
                    path: folder.join(&name),
                    source,
                }
            })?;

        let copied = File::open(&document.original_path)
            .and_then(|mut source| io::copy(&mut source, &mut target))
            .and_then(|_| target.sync_all());

        if let Err(source) = copied {
            drop(target);
            let _ = fs::remove_file(&destination);
            return Err(RouterError::FileOperation {
                path: document.original_path.clone(),
                source,
            });
        }

        Ok(destination)
    }
}

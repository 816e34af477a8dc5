// file: src/intake/upload.rs
// description: Inbox directory walking and upload discovery with filtering
// reference: https://docs.rs/walkdir

use crate::config::IntakeConfig;
use crate::error::{RouterError, Result};
use crate::extract::ExtractorRegistry;
use crate::intake::IncomingFile;
use crate::models::{Document, DocumentSource};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct UploadIntake {
    config: IntakeConfig,
}

impl UploadIntake {
    pub fn new(config: IntakeConfig) -> Self {
        Self { config }
    }

    /// Supported, unseen files under the inbox, sorted by path.
    pub fn scan(
        &self,
        registry: &ExtractorRegistry,
        known_hashes: &HashSet<String>,
    ) -> Result<Vec<IncomingFile>> {
        let root = &self.config.inbox_dir;
        if !root.exists() {
            debug!("Inbox {} does not exist yet", root.display());
            return Ok(Vec::new());
        }

        info!("Scanning inbox: {}", root.display());
        let max_size = (self.config.max_file_size_mb as u64) * 1024 * 1024;
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();

            if self.should_skip(path) {
                debug!("Skipping file: {}", path.display());
                continue;
            }

            if !registry.supports(path) {
                debug!("Skipping unsupported file: {}", path.display());
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if max_size > 0 && size > max_size {
                debug!(
                    "Skipping large file ({} MB): {}",
                    size / 1024 / 1024,
                    path.display()
                );
                continue;
            }

            let bytes = fs::read(path).map_err(|source| RouterError::FileOperation {
                path: path.to_path_buf(),
                source,
            })?;
            let content_hash = Document::compute_hash(&bytes);

            if !self.config.force_reprocess && known_hashes.contains(&content_hash) {
                debug!(
                    "Skipping already processed file: {} (hash {})",
                    path.display(),
                    content_hash
                );
                continue;
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            files.push(IncomingFile {
                path: path.to_path_buf(),
                file_name,
                size,
                content_hash,
                source: DocumentSource::Upload,
            });
        }

        info!("Found {} new upload(s)", files.len());
        Ok(files)
    }

    fn should_skip(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.config.skip_patterns {
            if let Some(dir) = pattern.strip_suffix("/*") {
                if path.components().any(|c| c.as_os_str() == dir) {
                    return true;
                }
            } else if let Some(suffix) = pattern.strip_prefix('*') {
                if path_str.ends_with(suffix) {
                    return true;
                }
            } else if path_str.contains(pattern.as_str()) {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(root: &Path) -> IntakeConfig {
        IntakeConfig {
            inbox_dir: root.to_path_buf(),
            skip_patterns: vec!["*.tmp".to_string(), ".git/*".to_string()],
            max_file_size_mb: 1,
            force_reprocess: false,
        }
    }

    #[test]
    fn test_scan_inbox() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "invoice").unwrap();
        fs::create_dir_all(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/a.pdf"), "%PDF").unwrap();
        fs::write(temp.path().join("skip.tmp"), "x").unwrap();
        fs::write(temp.path().join("archive.zip"), "x").unwrap();

        let intake = UploadIntake::new(config(temp.path()));
        let files = intake
            .scan(&ExtractorRegistry::default(), &HashSet::new())
            .unwrap();

        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.pdf"]);
        assert_eq!(files[0].source, DocumentSource::Upload);
        assert_eq!(files[0].content_hash, Document::compute_hash(b"invoice"));
    }

    #[test]
    fn test_known_hashes_skipped_unless_forced() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "seen").unwrap();
        let known: HashSet<String> = [Document::compute_hash(b"seen")].into_iter().collect();

        let intake = UploadIntake::new(config(temp.path()));
        assert!(intake.scan(&ExtractorRegistry::default(), &known).unwrap().is_empty());

        let mut forced = config(temp.path());
        forced.force_reprocess = true;
        let intake = UploadIntake::new(forced);
        assert_eq!(intake.scan(&ExtractorRegistry::default(), &known).unwrap().len(), 1);
    }

    #[test]
    fn test_oversized_files_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("big.txt"), "a".repeat(2 * 1024 * 1024)).unwrap();

        let intake = UploadIntake::new(config(temp.path()));
        assert!(intake.scan(&ExtractorRegistry::default(), &HashSet::new()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_inbox_is_empty() {
        let intake = UploadIntake::new(config(Path::new("/nonexistent/inbox")));
        assert!(intake.scan(&ExtractorRegistry::default(), &HashSet::new()).unwrap().is_empty());
    }

    #[test]
    fn test_skip_patterns() {
        let intake = UploadIntake::new(config(Path::new("/inbox")));

        assert!(intake.should_skip(&PathBuf::from("/inbox/upload.tmp")));
        assert!(intake.should_skip(&PathBuf::from("/inbox/.git/config")));
        assert!(!intake.should_skip(&PathBuf::from("/inbox/scan.pdf")));
    }
}

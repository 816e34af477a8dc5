// file: src/extract/mod.rs
// description: text extraction seam and extractor registry
// reference: delegates OCR and container formats to dedicated backends

pub mod docx;
pub mod ocr;
pub mod plain;

pub use docx::DocxExtractor;
pub use ocr::{OcrConfig, OcrExtractor};
pub use plain::PlainTextExtractor;

use crate::config::ExtractionConfig;
use crate::error::{RouterError, Result};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Turns a stored file into raw text.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }

    fn extract(&self, path: &Path) -> Result<String>;
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Ordered set of extractors; the first one supporting a file wins.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    pub fn new(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.extractors.iter().any(|e| e.supports(path))
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .extractors
            .iter()
            .flat_map(|e| e.extensions().iter().copied())
            .collect();
        extensions.sort_unstable();
        extensions.dedup();
        extensions
    }

    pub fn extract(&self, path: &Path) -> Result<String> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(path))
            .ok_or_else(|| {
                RouterError::UnsupportedFormat(
                    extension_of(path).unwrap_or_else(|| path.display().to_string()),
                )
            })?;

        debug!("Extracting {} with {}", path.display(), extractor.name());
        let text = extractor.extract(path)?;

        if text.trim().is_empty() {
            return Err(RouterError::Extraction {
                path: path.to_path_buf(),
                message: "no text found".to_string(),
            });
        }

        Ok(text)
    }
}

impl ExtractorRegistry {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let ocr = OcrConfig {
            language: config.ocr_language.clone(),
            max_pages: config.ocr_max_pages,
            dpi: config.ocr_dpi,
            fallback_dpi: config.ocr_fallback_dpi,
            preprocess: config.ocr_preprocess,
            render_timeout: Duration::from_secs(config.ocr_render_timeout_secs),
            page_timeout: Duration::from_secs(config.ocr_page_timeout_secs),
            attempt_timeout: Duration::from_secs(config.ocr_attempt_timeout_secs),
        };

        Self::new(vec![
            Box::new(PlainTextExtractor),
            Box::new(DocxExtractor),
            Box::new(OcrExtractor::with_config(ocr)),
        ])
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(extension_of(Path::new("SCAN.PDF")), Some("pdf".to_string()));
        assert_eq!(extension_of(Path::new("noext")), None);
    }

    #[test]
    fn test_default_registry_extensions() {
        let registry = ExtractorRegistry::default();
        let extensions = registry.supported_extensions();
        for ext in ["txt", "docx", "pdf", "png", "jpg"] {
            assert!(extensions.contains(&ext), "missing {}", ext);
        }
        assert!(!registry.supports(Path::new("archive.zip")));
    }

    #[test]
    fn test_unsupported_format() {
        let registry = ExtractorRegistry::default();
        let result = registry.extract(Path::new("archive.zip"));
        assert!(matches!(result, Err(RouterError::UnsupportedFormat(ext)) if ext == "zip"));
    }

    #[test]
    fn test_empty_text_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.txt");
        fs::write(&path, "   \n").unwrap();

        let result = ExtractorRegistry::default().extract(&path);
        assert!(matches!(result, Err(RouterError::Extraction { .. })));
    }
}

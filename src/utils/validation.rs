// file: src/utils/validation.rs
// description: argument and path validation for command handlers
// reference: input validation patterns

use crate::error::{RouterError, Result};
use crate::extract::{ExtractorRegistry, extension_of};
use std::fs;
use std::path::Path;

pub struct Validator;

impl Validator {
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            RouterError::Validation(format!(
                "Cannot canonicalize path {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(RouterError::Validation(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(RouterError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(RouterError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// The file must be something one of the registered extractors reads.
    pub fn validate_supported(path: &Path, registry: &ExtractorRegistry) -> Result<()> {
        if registry.supports(path) {
            return Ok(());
        }

        Err(RouterError::UnsupportedFormat(format!(
            "{} (supported: {})",
            extension_of(path).unwrap_or_else(|| "no extension".to_string()),
            registry.supported_extensions().join(", ")
        )))
    }

    /// Hold-out ratios must leave something on both sides.
    pub fn validate_test_ratio(ratio: f64) -> Result<()> {
        if ratio > 0.0 && ratio < 1.0 {
            return Ok(());
        }
        Err(RouterError::Validation(format!(
            "test ratio must be between 0 and 1 (exclusive), got {}",
            ratio
        )))
    }

    pub fn validate_label(label: &str) -> Result<()> {
        if label.trim().is_empty() {
            return Err(RouterError::Validation("Label is empty".to_string()));
        }
        Ok(())
    }
}

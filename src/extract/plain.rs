// file: src/extract/plain.rs
// description: plain text files read as-is

use crate::error::{RouterError, Result};
use crate::extract::TextExtractor;
use std::fs;
use std::path::Path;

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["txt", "md", "csv"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|source| RouterError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

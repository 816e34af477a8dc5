// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Text extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

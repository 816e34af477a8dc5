// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod classification;
pub mod document;
pub mod stats;

pub use classification::{Classification, ClassificationMethod};
pub use document::{Document, DocumentSource, DocumentStatus};
pub use stats::LabelStats;

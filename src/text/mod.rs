// file: src/text/mod.rs
// description: text normalization module exports
// reference: internal module structure

pub mod normalizer;
pub mod patterns;
pub mod tokenizer;

pub use normalizer::{clean_text, preview};
pub use tokenizer::Tokenizer;

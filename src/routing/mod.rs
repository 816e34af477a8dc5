// file: src/routing/mod.rs
// description: label-to-folder routing module exports
// reference: internal module structure

pub mod router;

pub use router::{DocumentRouter, sanitize_label};

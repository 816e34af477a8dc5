// file: src/intake/mod.rs
// description: document intake sources module exports
// reference: internal module structure

pub mod email;
pub mod poller;
pub mod upload;

pub use email::{MailDropIntake, ParsedMessage};
pub use poller::MailPoller;
pub use upload::UploadIntake;

use crate::models::DocumentSource;
use std::path::PathBuf;

/// A file waiting to be processed, as produced by any intake source.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub content_hash: String,
    pub source: DocumentSource,
}

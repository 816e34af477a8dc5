// file: src/models/document.rs
// description: core document model with lifecycle tracking and serialization
// reference: internal data structures

use crate::error::{RouterError, Result};
use crate::models::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Where a document arrived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentSource {
    Upload,
    Email {
        from: Option<String>,
        subject: Option<String>,
    },
}

impl DocumentSource {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentSource::Upload => "upload",
            DocumentSource::Email { .. } => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Ingested,
    Extracted,
    Classified,
    Routed,
    Failed,
}

impl DocumentStatus {
    /// Forward-only transitions; any non-terminal state may fail.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Ingested, Extracted)
                | (Extracted, Classified)
                | (Classified, Routed)
                | (Ingested | Extracted | Classified, Failed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentStatus::Ingested => "ingested",
            DocumentStatus::Extracted => "extracted",
            DocumentStatus::Classified => "classified",
            DocumentStatus::Routed => "routed",
            DocumentStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source: DocumentSource,
    pub file_name: String,
    pub original_path: PathBuf,
    pub content_hash: String,
    pub file_size: u64,
    #[serde(default)]
    pub text: String,
    pub classification: Option<Classification>,
    pub routed_to: Option<PathBuf>,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub ingested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        source: DocumentSource,
        file_name: String,
        original_path: PathBuf,
        content_hash: String,
        file_size: u64,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            source,
            file_name,
            original_path,
            content_hash,
            file_size,
            text: String::new(),
            classification: None,
            routed_to: None,
            status: DocumentStatus::Ingested,
            error: None,
            ingested_at: now,
            updated_at: now,
        }
    }

    pub fn compute_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn label(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.label.as_str())
    }

    pub fn mark_extracted(&mut self, text: String) -> Result<()> {
        self.transition(DocumentStatus::Extracted)?;
        self.text = text;
        Ok(())
    }

    pub fn mark_classified(&mut self, classification: Classification) -> Result<()> {
        self.transition(DocumentStatus::Classified)?;
        self.classification = Some(classification);
        Ok(())
    }

    pub fn mark_routed(&mut self, destination: PathBuf) -> Result<()> {
        self.transition(DocumentStatus::Routed)?;
        self.routed_to = Some(destination);
        Ok(())
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(DocumentStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, next: DocumentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RouterError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(
            DocumentSource::Upload,
            "scan.pdf".to_string(),
            PathBuf::from("/inbox/scan.pdf"),
            Document::compute_hash(b"scan"),
            4,
        )
    }

    #[test]
    fn test_document_creation() {
        let doc = sample();
        assert_eq!(doc.status, DocumentStatus::Ingested);
        assert_eq!(doc.content_hash.len(), 64);
        assert!(doc.label().is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut doc = sample();
        doc.mark_extracted("invoice total".to_string()).unwrap();
        doc.mark_classified(Classification::from_rule("invoice", vec![]))
            .unwrap();
        doc.mark_routed(PathBuf::from("/sorted/invoice/scan.pdf"))
            .unwrap();

        assert_eq!(doc.status, DocumentStatus::Routed);
        assert_eq!(doc.label(), Some("invoice"));
    }

    #[test]
    fn test_rejects_skipping_states() {
        let mut doc = sample();
        let err = doc.mark_routed(PathBuf::from("/x")).unwrap_err();
        assert!(matches!(err, RouterError::InvalidTransition { .. }));
        assert_eq!(doc.status, DocumentStatus::Ingested);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut doc = sample();
        doc.mark_failed("ocr timeout").unwrap();
        assert!(doc.mark_extracted(String::new()).is_err());
        assert!(doc.mark_failed("again").is_err());
    }

    #[test]
    fn test_hash_consistency() {
        assert_eq!(Document::compute_hash(b"abc"), Document::compute_hash(b"abc"));
        assert_ne!(Document::compute_hash(b"abc"), Document::compute_hash(b"abd"));
    }

    #[test]
    fn test_source_round_trip() {
        let source = DocumentSource::Email {
            from: Some("a@b.org".to_string()),
            subject: Some("Invoice".to_string()),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"kind\":\"email\""));
        let back: DocumentSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, source);
    }
}

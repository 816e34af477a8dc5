// file: src/pipeline/processor.rs
// description: drives a single incoming file through extraction, classification and routing
// reference: every outcome is a Document, failures are recorded rather than raised

use crate::classifier::HybridClassifier;
use crate::error::{RouterError, Result};
use crate::extract::ExtractorRegistry;
use crate::intake::IncomingFile;
use crate::models::{Classification, Document};
use crate::routing::DocumentRouter;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DocumentProcessor {
    registry: ExtractorRegistry,
    classifier: Arc<HybridClassifier>,
    router: DocumentRouter,
}

impl DocumentProcessor {
    pub fn new(
        registry: ExtractorRegistry,
        classifier: Arc<HybridClassifier>,
        router: DocumentRouter,
    ) -> Self {
        Self {
            registry,
            classifier,
            router,
        }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &HybridClassifier {
        &self.classifier
    }

    pub fn start(file: &IncomingFile) -> Document {
        Document::new(
            file.source.clone(),
            file.file_name.clone(),
            file.path.clone(),
            file.content_hash.clone(),
            file.size,
        )
    }

    pub fn extract(&self, path: &Path) -> Result<String> {
        self.registry.extract(path)
    }

    /// Extracts and classifies without routing, for one-off inspection.
    pub fn classify_file(&self, path: &Path) -> Result<(String, Classification)> {
        let text = self.extract(path)?;
        let classification = self.classifier.classify(&text);
        Ok((text, classification))
    }

    /// Takes an extracted document to `Routed`, or to `Failed` when routing
    /// goes wrong.
    pub fn classify_and_route(&self, mut document: Document) -> Document {
        let classification = self.classifier.classify(&document.text);
        debug!(
            "{} classified as '{}' ({}, {:.2})",
            document.file_name,
            classification.label,
            classification.method,
            classification.confidence
        );

        if let Err(e) = document.mark_classified(classification) {
            return Self::fail(document, e);
        }

        match self.router.route(&document) {
            Ok(destination) => {
                if let Err(e) = document.mark_routed(destination) {
                    return Self::fail(document, e);
                }
                document
            }
            Err(e) => Self::fail(document, e),
        }
    }

    /// Runs every stage in the calling thread.
    pub fn process(&self, file: &IncomingFile) -> Document {
        info!("Processing file: {}", file.path.display());
        let mut document = Self::start(file);

        let text = match self.extract(&file.path) {
            Ok(text) => text,
            Err(e) => return Self::fail(document, e),
        };

        if let Err(e) = document.mark_extracted(text) {
            return Self::fail(document, e);
        }

        self.classify_and_route(document)
    }

    pub fn fail(mut document: Document, error: RouterError) -> Document {
        warn!("Failed to process {}: {}", document.file_name, error);
        if let Err(e) = document.mark_failed(error.to_string()) {
            warn!("Could not record failure for {}: {}", document.file_name, e);
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RuleClassifier;
    use crate::config::{ClassificationRule, RoutingConfig};
    use crate::models::{ClassificationMethod, DocumentSource, DocumentStatus};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn processor(root: &Path) -> DocumentProcessor {
        let rules = RuleClassifier::new(vec![ClassificationRule {
            label: "invoice".to_string(),
            keywords: vec!["invoice".to_string(), "amount due".to_string()],
            min_matches: 1,
        }]);
        let classifier = HybridClassifier::new(rules, None, 0.5, "uncategorized");
        let router = DocumentRouter::new(RoutingConfig {
            output_root: root.join("sorted"),
            routes: HashMap::new(),
            move_files: false,
        });
        DocumentProcessor::new(ExtractorRegistry::default(), Arc::new(classifier), router)
    }

    fn incoming(path: PathBuf, body: &str) -> IncomingFile {
        fs::write(&path, body).unwrap();
        IncomingFile {
            file_name: path.file_name().unwrap().to_string_lossy().to_string(),
            path,
            size: body.len() as u64,
            content_hash: Document::compute_hash(body.as_bytes()),
            source: DocumentSource::Upload,
        }
    }

    #[test]
    fn test_process_routes_rule_match() {
        let temp = TempDir::new().unwrap();
        let processor = processor(temp.path());
        let file = incoming(temp.path().join("march.txt"), "INVOICE\nAmount due: $40");

        let document = processor.process(&file);

        assert_eq!(document.status, DocumentStatus::Routed);
        assert_eq!(document.label(), Some("invoice"));
        assert_eq!(
            document.classification.as_ref().map(|c| c.method),
            Some(ClassificationMethod::Rule)
        );
        assert_eq!(
            document.routed_to,
            Some(temp.path().join("sorted/invoice/march.txt"))
        );
    }

    #[test]
    fn test_process_unmatched_goes_to_fallback_folder() {
        let temp = TempDir::new().unwrap();
        let processor = processor(temp.path());
        let file = incoming(temp.path().join("note.txt"), "lunch at noon");

        let document = processor.process(&file);

        assert_eq!(document.label(), Some("uncategorized"));
        assert!(temp.path().join("sorted/uncategorized/note.txt").exists());
    }

    #[test]
    fn test_extraction_failure_is_recorded() {
        let temp = TempDir::new().unwrap();
        let processor = processor(temp.path());
        let file = incoming(temp.path().join("empty.txt"), "   ");

        let document = processor.process(&file);

        assert_eq!(document.status, DocumentStatus::Failed);
        assert!(document.error.unwrap().contains("no text found"));
        assert!(document.classification.is_none());
    }

    #[test]
    fn test_classify_file_does_not_route() {
        let temp = TempDir::new().unwrap();
        let processor = processor(temp.path());
        let file = incoming(temp.path().join("march.txt"), "invoice");

        let (text, classification) = processor.classify_file(&file.path).unwrap();
        assert_eq!(text, "invoice");
        assert_eq!(classification.label, "invoice");
        assert!(!temp.path().join("sorted").exists());
    }
}

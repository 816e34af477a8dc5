// file: src/pipeline/orchestrator.rs
// description: coordinates intake, concurrent processing and ledger bookkeeping
// reference: orchestrates asynchronous processing passes and the watch loop

use crate::classifier::HybridClassifier;
use crate::config::Config;
use crate::error::{RouterError, Result};
use crate::extract::ExtractorRegistry;
use crate::intake::{IncomingFile, MailDropIntake, MailPoller, UploadIntake};
use crate::models::Document;
use crate::pipeline::processor::DocumentProcessor;
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::routing::DocumentRouter;
use crate::store::Ledger;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct PipelineOrchestrator {
    config: Config,
    processor: Arc<DocumentProcessor>,
    ledger: Arc<Mutex<Ledger>>,
    max_concurrent_tasks: usize,
    show_progress: bool,
    color: bool,
}

impl PipelineOrchestrator {
    pub fn new(config: Config) -> Result<Self> {
        let classifier = HybridClassifier::from_config(&config.classifier)?;
        let router = DocumentRouter::new(config.routing.clone());
        let processor = DocumentProcessor::new(
            ExtractorRegistry::from_config(&config.extraction),
            Arc::new(classifier),
            router,
        );
        let ledger = Ledger::load(&config.pipeline.ledger_path)?;

        Ok(Self::with_processor(config, processor, ledger))
    }

    pub fn with_processor(config: Config, processor: DocumentProcessor, ledger: Ledger) -> Self {
        let max_concurrent_tasks = config.pipeline.parallel_workers.max(1);

        Self {
            config,
            processor: Arc::new(processor),
            ledger: Arc::new(Mutex::new(ledger)),
            max_concurrent_tasks,
            show_progress: true,
            color: true,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Styles the progress bars; follows the `--color` flag.
    pub fn use_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        self.ledger.clone()
    }

    /// One pass over the inbox and the mail drop.
    pub async fn run_once(&self, force: bool, limit: Option<usize>) -> Result<PipelineStats> {
        let force = force || self.config.intake.force_reprocess;

        let mut files = self.collect(force).await?;
        info!("Found {} file(s) to process", files.len());

        if let Some(limit) = limit {
            files.truncate(limit);
        }

        if files.is_empty() {
            return Ok(PipelineStats::new());
        }

        let progress = Arc::new(self.progress_tracker(files.len()));

        info!(
            "Processing files with {} concurrent tasks...",
            self.max_concurrent_tasks
        );
        self.process_files(files, progress.clone()).await;

        let stats = progress.get_stats();
        progress.finish();
        self.log_final_stats(&stats);

        Ok(stats)
    }

    /// Repeats `run_once` every `interval` until Ctrl-C.
    pub async fn watch(&self, interval: Duration) -> Result<PipelineStats> {
        let poller = MailPoller::new(interval);
        let totals = Arc::new(std::sync::Mutex::new(PipelineStats::new()));

        let ticks = poller
            .run_until_ctrl_c(|| {
                let totals = totals.clone();
                async move {
                    let stats = self.run_once(false, None).await?;
                    if let Ok(mut totals) = totals.lock() {
                        totals.merge(&stats);
                    }
                    Ok(())
                }
            })
            .await?;

        let totals = totals
            .lock()
            .map(|t| t.clone())
            .map_err(|e| RouterError::Validation(format!("watch totals poisoned: {}", e)))?;
        info!("Watch stopped after {} pass(es): {}", ticks, totals.summary());
        Ok(totals)
    }

    async fn collect(&self, force: bool) -> Result<Vec<IncomingFile>> {
        let known_hashes = if force {
            Default::default()
        } else {
            self.ledger.lock().await.known_hashes()
        };

        let intake_config = self.config.intake.clone();
        let email_config = self.config.email.clone();
        let processor = self.processor.clone();

        tokio::task::spawn_blocking(move || {
            let registry = processor.registry();

            let mut files = UploadIntake::new(intake_config).scan(registry, &known_hashes)?;
            let mail = MailDropIntake::new(email_config);
            files.extend(mail.collect(registry, &known_hashes, force)?);

            Ok::<_, RouterError>(files)
        })
        .await
        .map_err(|e| RouterError::Validation(format!("Intake task failed: {}", e)))?
    }

    async fn process_files(&self, files: Vec<IncomingFile>, progress: Arc<ProgressTracker>) {
        let timeout = Duration::from_secs(self.config.pipeline.extraction_timeout_secs);

        let tasks = files.into_iter().map(|file| {
            let processor = self.processor.clone();
            let ledger = self.ledger.clone();
            let progress = progress.clone();

            async move {
                progress.set_message(format!("Processing {}", file.file_name));
                let document = process_one(processor, &file, timeout).await;

                match document.classification.as_ref() {
                    Some(c) if document.routed_to.is_some() => {
                        progress.inc_routed(c.method);
                        progress.add_bytes_processed(file.size);
                    }
                    _ => progress.inc_failed(),
                }

                if let Err(e) = ledger.lock().await.append(&document) {
                    error!(
                        "Failed to record {} in the ledger: {}",
                        document.file_name, e
                    );
                }
            }
        });

        stream::iter(tasks)
            .buffer_unordered(self.max_concurrent_tasks)
            .collect::<Vec<()>>()
            .await;
    }

    fn progress_tracker(&self, total: usize) -> ProgressTracker {
        if self.show_progress {
            ProgressTracker::with_color(total, self.color)
        } else {
            ProgressTracker::hidden(total)
        }
    }

    fn log_final_stats(&self, stats: &PipelineStats) {
        info!("=== Processing Summary ===");
        info!("Duration: {} seconds", stats.duration_secs);
        info!("Documents routed: {}", stats.documents_routed);
        info!("Documents failed: {}", stats.documents_failed);
        info!("Success rate: {:.2}%", stats.success_rate());
        info!(
            "Classified by rule / model / fallback: {} / {} / {}",
            stats.rule_matches, stats.model_predictions, stats.fallbacks
        );
        info!(
            "Processing speed: {:.2} documents/sec",
            stats.documents_per_second()
        );
        info!("==========================");
    }
}

/// Extraction runs under the timeout; classification and routing only start
/// once text is in hand.
///
/// A timed-out blocking task is not cancelled. It finishes on its own
/// because every OCR child process carries its own deadline and is killed
/// when that passes, so abandoned work and its children stay bounded.
async fn process_one(
    processor: Arc<DocumentProcessor>,
    file: &IncomingFile,
    timeout: Duration,
) -> Document {
    let mut document = DocumentProcessor::start(file);

    let path = file.path.clone();
    let extraction = {
        let processor = processor.clone();
        tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || processor.extract(&path)),
        )
        .await
    };

    let text = match extraction {
        Ok(Ok(Ok(text))) => text,
        Ok(Ok(Err(e))) => return DocumentProcessor::fail(document, e),
        Ok(Err(join_error)) => {
            error!("Extraction task panicked: {}", join_error);
            return DocumentProcessor::fail(
                document,
                RouterError::Extraction {
                    path: file.path.clone(),
                    message: "extraction task aborted".to_string(),
                },
            );
        }
        Err(_) => {
            warn!(
                "Extraction of {} exceeded {}s",
                file.path.display(),
                timeout.as_secs()
            );
            return DocumentProcessor::fail(
                document,
                RouterError::Extraction {
                    path: file.path.clone(),
                    message: format!("timed out after {}s", timeout.as_secs()),
                },
            );
        }
    };

    if let Err(e) = document.mark_extracted(text) {
        return DocumentProcessor::fail(document, e);
    }

    let fallback = document.clone();
    match tokio::task::spawn_blocking(move || processor.classify_and_route(document)).await {
        Ok(document) => document,
        Err(join_error) => {
            error!("Routing task panicked: {}", join_error);
            DocumentProcessor::fail(
                fallback,
                RouterError::Routing("routing task aborted".to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RuleClassifier;
    use crate::config::ClassificationRule;
    use crate::extract::TextExtractor;
    use crate::models::DocumentStatus;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default_config();
        config.intake.inbox_dir = root.join("inbox");
        config.email.maildrop_dir = root.join("maildrop");
        config.email.staging_dir = root.join("staging");
        config.classifier.model_path = root.join("model.json");
        config.classifier.rules = vec![ClassificationRule {
            label: "invoice".to_string(),
            keywords: vec!["invoice".to_string()],
            min_matches: 1,
        }];
        config.routing.output_root = root.join("sorted");
        config.pipeline.ledger_path = root.join("ledger.jsonl");
        config.pipeline.parallel_workers = 2;
        config
    }

    fn orchestrator(config: Config) -> PipelineOrchestrator {
        PipelineOrchestrator::new(config).unwrap().show_progress(false)
    }

    #[test]
    fn test_orchestrator_creation() {
        let temp = TempDir::new().unwrap();
        let orchestrator = orchestrator(test_config(temp.path()));
        assert_eq!(orchestrator.max_concurrent_tasks, 2);
        assert!(!orchestrator.processor().classifier().has_model());

        let ledger = tokio_test::block_on(orchestrator.ledger().lock_owned());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_run_once_routes_and_records() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.intake.inbox_dir).unwrap();
        fs::write(config.intake.inbox_dir.join("a.txt"), "Invoice 7").unwrap();
        fs::write(config.intake.inbox_dir.join("b.txt"), "holiday plans").unwrap();
        fs::write(config.intake.inbox_dir.join("c.txt"), "").unwrap();

        let orchestrator = orchestrator(config.clone());
        let stats = orchestrator.run_once(false, None).await.unwrap();

        assert_eq!(stats.documents_routed, 2);
        assert_eq!(stats.documents_failed, 1);
        assert_eq!(stats.rule_matches, 1);
        assert_eq!(stats.fallbacks, 1);
        assert!(temp.path().join("sorted/invoice/a.txt").exists());
        assert!(temp.path().join("sorted/uncategorized/b.txt").exists());

        let ledger = Ledger::load(&config.pipeline.ledger_path).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.stats().failed(), 1);
    }

    #[tokio::test]
    async fn test_second_pass_skips_routed_files() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.intake.inbox_dir).unwrap();
        fs::write(config.intake.inbox_dir.join("a.txt"), "Invoice 7").unwrap();

        let orchestrator = orchestrator(config);
        let first = orchestrator.run_once(false, None).await.unwrap();
        let second = orchestrator.run_once(false, None).await.unwrap();
        let forced = orchestrator.run_once(true, None).await.unwrap();

        assert_eq!(first.documents_routed, 1);
        assert_eq!(second.total(), 0);
        assert_eq!(forced.documents_routed, 1);
    }

    #[tokio::test]
    async fn test_limit_caps_the_pass() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.intake.inbox_dir).unwrap();
        for i in 0..3 {
            fs::write(
                config.intake.inbox_dir.join(format!("{}.txt", i)),
                format!("invoice {}", i),
            )
            .unwrap();
        }

        let stats = orchestrator(config).run_once(false, Some(2)).await.unwrap();
        assert_eq!(stats.total(), 2);
    }

    #[tokio::test]
    async fn test_custom_processor() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let classifier = HybridClassifier::new(RuleClassifier::default(), None, 0.5, "misc");
        let processor = DocumentProcessor::new(
            ExtractorRegistry::default(),
            Arc::new(classifier),
            DocumentRouter::new(config.routing.clone()),
        );
        let ledger = Ledger::load(&config.pipeline.ledger_path).unwrap();

        fs::create_dir_all(&config.intake.inbox_dir).unwrap();
        fs::write(config.intake.inbox_dir.join("a.txt"), "Invoice 7").unwrap();

        let orchestrator =
            PipelineOrchestrator::with_processor(config, processor, ledger).show_progress(false);
        orchestrator.run_once(false, None).await.unwrap();

        let ledger = orchestrator.ledger();
        let ledger = ledger.lock().await;
        let docs = ledger.documents();
        assert_eq!(docs[0].label(), Some("misc"));
        assert_eq!(docs[0].status, DocumentStatus::Routed);
    }

    struct SlowExtractor;

    impl TextExtractor for SlowExtractor {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["txt"]
        }

        fn extract(&self, _path: &Path) -> Result<String> {
            std::thread::sleep(Duration::from_secs(2));
            Ok("invoice".to_string())
        }
    }

    #[tokio::test]
    async fn test_slow_extraction_fails_with_timeout() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        config.pipeline.extraction_timeout_secs = 1;

        let classifier = HybridClassifier::new(RuleClassifier::default(), None, 0.5, "misc");
        let processor = DocumentProcessor::new(
            ExtractorRegistry::new(vec![Box::new(SlowExtractor)]),
            Arc::new(classifier),
            DocumentRouter::new(config.routing.clone()),
        );
        let ledger = Ledger::load(&config.pipeline.ledger_path).unwrap();

        fs::create_dir_all(&config.intake.inbox_dir).unwrap();
        fs::write(config.intake.inbox_dir.join("a.txt"), "Invoice 7").unwrap();

        let orchestrator =
            PipelineOrchestrator::with_processor(config, processor, ledger).show_progress(false);
        let stats = orchestrator.run_once(false, None).await.unwrap();

        assert_eq!(stats.documents_failed, 1);
        assert_eq!(stats.documents_routed, 0);

        let ledger = orchestrator.ledger();
        let ledger = ledger.lock().await;
        let docs = ledger.documents();
        assert_eq!(docs[0].status, DocumentStatus::Failed);
        assert!(docs[0].error.as_deref().unwrap_or_default().contains("timed out"));
        assert!(!temp.path().join("sorted/misc/a.txt").exists());
    }

    #[test]
    fn test_progress_follows_color_flag() {
        let temp = TempDir::new().unwrap();
        let orchestrator = orchestrator(test_config(temp.path()));
        assert!(orchestrator.color);

        let orchestrator = orchestrator.use_color(false);
        assert!(!orchestrator.color);
        assert_eq!(orchestrator.progress_tracker(3).get_stats().total(), 0);
    }
}

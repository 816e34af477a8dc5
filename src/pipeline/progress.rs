// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for processing passes
// reference: uses indicatif for progress bars and tracks routing outcomes

use crate::models::ClassificationMethod;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub documents_routed: usize,
    pub documents_failed: usize,
    pub rule_matches: usize,
    pub model_predictions: usize,
    pub fallbacks: usize,
    pub total_bytes_processed: u64,
    pub duration_secs: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.documents_routed + self.documents_failed
    }

    pub fn documents_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.total() as f64 / self.duration_secs as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.documents_routed as f64 / total as f64) * 100.0
    }

    /// Folds another pass into this one, used by the watch loop.
    pub fn merge(&mut self, other: &PipelineStats) {
        self.documents_routed += other.documents_routed;
        self.documents_failed += other.documents_failed;
        self.rule_matches += other.rule_matches;
        self.model_predictions += other.model_predictions;
        self.fallbacks += other.fallbacks;
        self.total_bytes_processed += other.total_bytes_processed;
        self.duration_secs += other.duration_secs;
    }

    pub fn summary(&self) -> String {
        format!(
            "{} routed, {} failed ({} rule / {} model / {} fallback)",
            self.documents_routed.to_string().green(),
            self.documents_failed.to_string().red(),
            self.rule_matches,
            self.model_predictions,
            self.fallbacks
        )
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    documents_routed: Arc<AtomicUsize>,
    documents_failed: Arc<AtomicUsize>,
    rule_matches: Arc<AtomicUsize>,
    model_predictions: Arc<AtomicUsize>,
    fallbacks: Arc<AtomicUsize>,
    bytes_processed: Arc<AtomicU64>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_documents: usize) -> Self {
        Self::with_color(total_documents, true)
    }

    pub fn with_color(total_documents: usize, colored: bool) -> Self {
        Self::build(MultiProgress::new(), total_documents, colored)
    }

    /// Tracks counts without drawing anything.
    pub fn hidden(total_documents: usize) -> Self {
        Self::build(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            total_documents,
            false,
        )
    }

    fn build(multi_progress: MultiProgress, total_documents: usize, colored: bool) -> Self {
        let main_bar = create_progress_bar(&multi_progress, total_documents as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            documents_routed: Arc::new(AtomicUsize::new(0)),
            documents_failed: Arc::new(AtomicUsize::new(0)),
            rule_matches: Arc::new(AtomicUsize::new(0)),
            model_predictions: Arc::new(AtomicUsize::new(0)),
            fallbacks: Arc::new(AtomicUsize::new(0)),
            bytes_processed: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_routed(&self, method: ClassificationMethod) {
        self.documents_routed.fetch_add(1, Ordering::SeqCst);
        let counter = match method {
            ClassificationMethod::Rule => &self.rule_matches,
            ClassificationMethod::Model => &self.model_predictions,
            ClassificationMethod::Fallback => &self.fallbacks,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn add_bytes_processed(&self, bytes: u64) {
        self.bytes_processed.fetch_add(bytes, Ordering::SeqCst);
    }

    pub fn set_message(&self, message: String) {
        self.detail_bar.set_message(message);
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Processing complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            documents_routed: self.documents_routed.load(Ordering::SeqCst),
            documents_failed: self.documents_failed.load(Ordering::SeqCst),
            rule_matches: self.rule_matches.load(Ordering::SeqCst),
            model_predictions: self.model_predictions.load(Ordering::SeqCst),
            fallbacks: self.fallbacks.load(Ordering::SeqCst),
            total_bytes_processed: self.bytes_processed.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn update_detail_bar(&self) {
        let routed = self.documents_routed.load(Ordering::SeqCst);
        let failed = self.documents_failed.load(Ordering::SeqCst);

        let message = format!("Routed: {} | Failed: {}", routed, failed);

        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    if colored {
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )
                .expect("Failed to create progress bar template")
                .progress_chars("█▓▒░"),
        );
    } else {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}")
                .expect("Failed to create progress bar template")
                .progress_chars("=>-"),
        );
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    let style = ProgressStyle::default_bar()
        .template("{msg}")
        .expect("Failed to create detail bar template");
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stats_calculations() {
        let mut stats = PipelineStats::new();
        stats.documents_routed = 90;
        stats.documents_failed = 10;
        stats.duration_secs = 10;

        assert_eq!(stats.documents_per_second(), 10.0);
        assert_eq!(stats.success_rate(), 90.0);
    }

    #[test]
    fn test_pipeline_stats_zero_duration() {
        let stats = PipelineStats::new();
        assert_eq!(stats.documents_per_second(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_merge() {
        let mut total = PipelineStats::new();
        let pass = PipelineStats {
            documents_routed: 2,
            documents_failed: 1,
            rule_matches: 1,
            model_predictions: 1,
            fallbacks: 0,
            total_bytes_processed: 10,
            duration_secs: 1,
        };
        total.merge(&pass);
        total.merge(&pass);

        assert_eq!(total.documents_routed, 4);
        assert_eq!(total.total(), 6);
        assert_eq!(total.total_bytes_processed, 20);
    }

    #[test]
    fn test_progress_tracker_counts_methods() {
        let tracker = ProgressTracker::hidden(3);

        tracker.inc_routed(ClassificationMethod::Rule);
        tracker.inc_routed(ClassificationMethod::Fallback);
        tracker.add_bytes_processed(1024);

        let stats = tracker.get_stats();
        assert_eq!(stats.documents_routed, 2);
        assert_eq!(stats.rule_matches, 1);
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.model_predictions, 0);
        assert_eq!(stats.total_bytes_processed, 1024);
    }

    #[test]
    fn test_progress_tracker_failures() {
        let tracker = ProgressTracker::hidden(100);

        tracker.inc_failed();
        tracker.inc_failed();

        let stats = tracker.get_stats();
        assert_eq!(stats.documents_failed, 2);
    }
}

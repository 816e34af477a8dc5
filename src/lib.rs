// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod classifier;
pub mod config;
pub mod error;
pub mod exporter;
pub mod extract;
pub mod intake;
pub mod models;
pub mod pipeline;
pub mod routing;
pub mod store;
pub mod text;
pub mod utils;

pub use classifier::{
    ClassifierModel, EvaluationReport, HybridClassifier, RuleClassifier, TrainingSample,
};
pub use config::{
    ClassificationRule, ClassifierConfig, Config, EmailConfig, ExtractionConfig, ForestConfig,
    IntakeConfig, PipelineConfig, RoutingConfig, VectorizerConfig,
};
pub use error::{Result, RouterError};
pub use exporter::{ExportManifest, JsonExporter};
pub use extract::{ExtractorRegistry, TextExtractor};
pub use intake::{IncomingFile, MailDropIntake, MailPoller, UploadIntake};
pub use models::{
    Classification, ClassificationMethod, Document, DocumentSource, DocumentStatus, LabelStats,
};
pub use pipeline::{DocumentProcessor, PipelineOrchestrator, PipelineStats, ProgressTracker};
pub use routing::DocumentRouter;
pub use store::Ledger;
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};

// file: src/classifier/mod.rs
// description: hybrid classification engine module exports
// reference: internal module structure

pub mod engine;
pub mod forest;
pub mod model;
pub mod rules;
pub mod tfidf;
pub mod training;

pub use engine::HybridClassifier;
pub use forest::RandomForest;
pub use model::{ClassifierModel, Prediction, TrainingSample};
pub use rules::{RuleClassifier, RuleMatch};
pub use tfidf::{SparseVector, TfidfVectorizer};
pub use training::{
    EvaluationReport, LabelMetrics, evaluate, load_training_dir, split_holdout, train_and_evaluate,
};

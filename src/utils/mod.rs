// file: src/utils/mod.rs
// description: utility functions module exports
// reference: internal module structure

pub mod files;
pub mod logging;
pub mod telemetry;
pub mod validation;

pub use files::create_unique;
pub use telemetry::{HealthCheck, HealthReport, HealthStatus, OperationTimer};
pub use validation::Validator;

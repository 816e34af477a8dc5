// file: src/utils/telemetry.rs
// description: Health reporting and operation timing
// reference: backs the verify command and long-running command logs

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn icon(self) -> String {
        match self {
            HealthStatus::Healthy => "✓".green().to_string(),
            HealthStatus::Degraded => "⚠".yellow().to_string(),
            HealthStatus::Unhealthy => "✗".red().to_string(),
        }
    }
}

/// Result of checking one component of the installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

impl HealthCheck {
    pub fn healthy(component: &str) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    pub fn degraded(component: &str, message: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(component: &str, message: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub checked_at: String,
    pub version: String,
}

impl HealthReport {
    /// Overall status is the worst of the individual checks.
    pub fn new(checks: Vec<HealthCheck>, version: impl Into<String>) -> Self {
        let overall_status = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            overall_status,
            checks,
            checked_at: chrono::Utc::now()
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            version: version.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status != HealthStatus::Unhealthy
    }

    pub fn format(&self) -> String {
        let mut output = format!(
            "{} Installation: {:?}\nVersion: {}\nChecked: {}\n\n",
            self.overall_status.icon(),
            self.overall_status,
            self.version,
            self.checked_at
        );

        for check in &self.checks {
            output.push_str(&format!("{} {}", check.status.icon(), check.component));
            if let Some(ref msg) = check.message {
                output.push_str(&format!(" - {}", msg));
            }
            output.push('\n');
        }

        output
    }
}

/// Logs start and completion of a named operation.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting operation: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn checkpoint(&self, message: &str) {
        info!(
            "[{}] {} at {:.2}s",
            self.operation,
            message,
            self.elapsed().as_secs_f64()
        );
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed operation: {} in {:.2}s",
            self.operation,
            elapsed.as_secs_f64()
        );
        elapsed
    }

    pub fn finish_with_count(self, count: usize) -> Duration {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();
        info!(
            "Completed operation: {} - {} items in {:.2}s ({:.2} items/sec)",
            self.operation,
            count,
            secs,
            if secs > 0.0 { count as f64 / secs } else { 0.0 }
        );
        elapsed
    }
}

// file: src/pipeline/health.rs
// description: installation checks behind the verify command

use crate::classifier::ClassifierModel;
use crate::config::Config;
use crate::extract::OcrExtractor;
use crate::store::Ledger;
use crate::utils::{HealthCheck, HealthReport};
use std::path::Path;

pub fn check_installation(config: &Config) -> HealthReport {
    let mut checks = vec![
        match config.validate() {
            Ok(()) => HealthCheck::healthy("configuration"),
            Err(e) => HealthCheck::unhealthy("configuration", e.to_string()),
        },
        check_dir("inbox", &config.intake.inbox_dir),
    ];

    checks.push(if config.email.enabled {
        check_dir("mail drop", &config.email.maildrop_dir)
    } else {
        HealthCheck::healthy("mail drop").with_message("disabled")
    });

    checks.push(check_model(config));

    for (tool, available) in OcrExtractor::tool_availability() {
        let component = format!("ocr: {}", tool);
        checks.push(if available {
            HealthCheck::healthy(&component)
        } else {
            HealthCheck::degraded(&component, "not found in PATH; scans and PDFs will fail")
        });
    }

    checks.push(check_ledger(&config.pipeline.ledger_path));

    HealthReport::new(checks, env!("CARGO_PKG_VERSION"))
}

fn check_dir(component: &str, path: &Path) -> HealthCheck {
    if path.is_dir() {
        HealthCheck::healthy(component).with_message(path.display().to_string())
    } else {
        HealthCheck::degraded(component, format!("{} does not exist", path.display()))
    }
}

fn check_model(config: &Config) -> HealthCheck {
    let rules = config.classifier.rules.len();
    let path = &config.classifier.model_path;

    if !path.exists() {
        let message = format!("no model at {}; {} rule(s) only", path.display(), rules);
        return if rules == 0 {
            HealthCheck::degraded("classifier", format!("{}, everything falls back", message))
        } else {
            HealthCheck::degraded("classifier", message)
        };
    }

    match ClassifierModel::load(path) {
        Ok(model) => HealthCheck::healthy("classifier").with_message(format!(
            "{} rule(s), model with {} labels and {} terms",
            rules,
            model.labels().len(),
            model.vocabulary_size()
        )),
        Err(e) => HealthCheck::unhealthy("classifier", e.to_string()),
    }
}

fn check_ledger(path: &Path) -> HealthCheck {
    let ledger = match Ledger::load(path) {
        Ok(ledger) => ledger,
        Err(e) => return HealthCheck::unhealthy("ledger", e.to_string()),
    };

    match ledger.check_routed() {
        Ok(check) if check.is_clean() => HealthCheck::healthy("ledger").with_message(format!(
            "{} entries, {} routed file(s) intact",
            ledger.len(),
            check.routed
        )),
        Ok(check) => HealthCheck::degraded(
            "ledger",
            format!(
                "{} routed file(s) missing, {} modified since routing",
                check.missing.len(),
                check.modified.len()
            ),
        ),
        Err(e) => HealthCheck::unhealthy("ledger", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::HealthStatus;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        let mut config = Config::default_config();
        config.intake.inbox_dir = root.join("inbox");
        config.email.maildrop_dir = root.join("maildrop");
        config.classifier.model_path = root.join("model.json");
        config.pipeline.ledger_path = root.join("ledger.jsonl");
        config
    }

    fn status_of(report: &HealthReport, component: &str) -> HealthStatus {
        report
            .checks
            .iter()
            .find(|c| c.component == component)
            .map(|c| c.status)
            .unwrap()
    }

    #[test]
    fn test_fresh_installation_is_degraded_not_broken() {
        let temp = TempDir::new().unwrap();
        let report = check_installation(&config(temp.path()));

        assert_eq!(status_of(&report, "configuration"), HealthStatus::Healthy);
        assert_eq!(status_of(&report, "inbox"), HealthStatus::Degraded);
        assert_eq!(status_of(&report, "classifier"), HealthStatus::Degraded);
        assert_eq!(status_of(&report, "ledger"), HealthStatus::Healthy);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_corrupt_model_is_unhealthy() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        fs::write(&config.classifier.model_path, "{ not a model").unwrap();

        let report = check_installation(&config);
        assert_eq!(status_of(&report, "classifier"), HealthStatus::Unhealthy);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_existing_directories_are_healthy() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        fs::create_dir_all(&config.intake.inbox_dir).unwrap();
        fs::create_dir_all(&config.email.maildrop_dir).unwrap();

        let report = check_installation(&config);
        assert_eq!(status_of(&report, "inbox"), HealthStatus::Healthy);
        assert_eq!(status_of(&report, "mail drop"), HealthStatus::Healthy);
    }
}

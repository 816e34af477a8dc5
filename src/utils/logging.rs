// file: src/utils/logging.rs
// description: Tracing subscriber initialization and coloured console helpers

use crate::models::{Classification, ClassificationMethod};
use colored::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_ansi(colored_output);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    colored::control::set_override(colored_output);
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

/// One-line rendering of a classification for terminal output.
pub fn format_classification(classification: &Classification) -> String {
    let method = match classification.method {
        ClassificationMethod::Rule => "rule".cyan(),
        ClassificationMethod::Model => "model".magenta(),
        ClassificationMethod::Fallback => "fallback".yellow(),
    };

    let mut line = format!(
        "{} via {} (confidence {:.2})",
        classification.label.bold(),
        method,
        classification.confidence
    );

    if !classification.matched_keywords.is_empty() {
        line.push_str(&format!(
            " [{}]",
            classification.matched_keywords.join(", ")
        ));
    }

    line
}

// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use doc_router::classifier::{load_training_dir, train_and_evaluate};
use doc_router::pipeline::check_installation;
use doc_router::text::preview;
use doc_router::utils::logging::{
    format_classification, format_error, format_info, format_success, format_warning,
};
use doc_router::{
    ClassifierModel, Config, ExtractorRegistry, JsonExporter, Ledger, OperationTimer,
    PipelineOrchestrator, Validator,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "doc_router")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(
    about = "Classifies incoming documents with keyword rules and a trained model, then files them by label",
    long_about = None
)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process everything waiting in the inbox and the mail drop once
    Ingest {
        #[arg(long)]
        force: bool,

        #[arg(long, value_name = "NUM")]
        limit: Option<usize>,
    },

    /// Keep processing on a fixed interval until Ctrl-C
    Watch {
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Show how a single file would be classified without routing it
    Classify {
        file: PathBuf,
    },

    /// Train the statistical model from a labelled directory tree
    Train {
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Measure model accuracy on a hold-out split
    Evaluate {
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,

        #[arg(long, default_value_t = 0.2)]
        test_ratio: f64,
    },

    /// Summarise the processing ledger
    Stats,

    /// Write ledger documents and a manifest as JSON
    Export {
        #[arg(short, long, default_value = "./exports")]
        output: PathBuf,

        #[arg(short, long)]
        pretty: bool,

        #[arg(long)]
        label: Option<String>,
    },

    /// Check configuration, directories, model, OCR tools and ledger
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    doc_router::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Document Router");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Ingest { force, limit } => {
            cmd_ingest(&config, force, limit, cli.color).await?;
        }
        Commands::Watch { interval } => {
            cmd_watch(&config, interval, cli.color).await?;
        }
        Commands::Classify { file } => {
            cmd_classify(&config, file).await?;
        }
        Commands::Train { data, output } => {
            cmd_train(&config, data, output).await?;
        }
        Commands::Evaluate { data, test_ratio } => {
            cmd_evaluate(&config, data, test_ratio).await?;
        }
        Commands::Stats => {
            cmd_stats(&config)?;
        }
        Commands::Export {
            output,
            pretty,
            label,
        } => {
            cmd_export(&config, output, pretty, label)?;
        }
        Commands::Verify => {
            cmd_verify(&config).await?;
        }
    }

    Ok(())
}

async fn cmd_ingest(
    config: &Config,
    force: bool,
    limit: Option<usize>,
    color: bool,
) -> Result<()> {
    info!("Starting ingestion pass");
    let timer = OperationTimer::new("ingest");

    let orchestrator = PipelineOrchestrator::new(config.clone())
        .context("Failed to set up pipeline")?
        .use_color(color);
    let stats = orchestrator
        .run_once(force, limit)
        .await
        .context("Ingestion pass failed")?;

    timer.finish_with_count(stats.total());

    if stats.total() == 0 {
        println!("{}", format_info("Nothing new to process"));
    } else if stats.documents_failed > 0 {
        println!("{}", format_warning(&stats.summary()));
    } else {
        println!("{}", format_success(&stats.summary()));
    }

    Ok(())
}

async fn cmd_watch(config: &Config, interval: Option<u64>, color: bool) -> Result<()> {
    let secs = interval.unwrap_or(config.pipeline.poll_interval_secs);
    if secs == 0 {
        anyhow::bail!("Interval must be greater than 0");
    }

    info!("Watching inbox and mail drop every {}s (Ctrl-C to stop)", secs);

    let orchestrator = PipelineOrchestrator::new(config.clone())
        .context("Failed to set up pipeline")?
        .use_color(color);
    let totals = orchestrator
        .watch(Duration::from_secs(secs))
        .await
        .context("Watch loop failed")?;

    println!("{}", format_success(&totals.summary()));
    Ok(())
}

async fn cmd_classify(config: &Config, file: PathBuf) -> Result<()> {
    Validator::validate_file_path(&file)?;
    let registry = ExtractorRegistry::from_config(&config.extraction);
    Validator::validate_supported(&file, &registry)?;

    let orchestrator =
        PipelineOrchestrator::new(config.clone()).context("Failed to set up classifier")?;

    let path = file.clone();
    let (text, classification) = tokio::task::spawn_blocking(move || {
        orchestrator.processor().classify_file(&path)
    })
    .await
    .context("Classification task failed")?
    .with_context(|| format!("Failed to classify {}", file.display()))?;

    println!("\n{}", file.display());
    println!("  {}", format_classification(&classification));
    println!("\n  Preview:");
    for line in preview(&text, 400).lines().take(8) {
        println!("    {}", line);
    }
    println!();

    Ok(())
}

async fn cmd_train(
    config: &Config,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let data = data.unwrap_or_else(|| config.classifier.training_dir.clone());
    let output = output.unwrap_or_else(|| config.classifier.model_path.clone());
    Validator::validate_directory(&data)?;

    let timer = OperationTimer::new("train");
    let vectorizer = config.classifier.vectorizer.clone();
    let forest = config.classifier.forest.clone();
    let registry = ExtractorRegistry::from_config(&config.extraction);

    let model = tokio::task::spawn_blocking(move || {
        let samples = load_training_dir(&data, &registry)?;
        ClassifierModel::train(&samples, vectorizer, &forest)
    })
    .await
    .context("Training task failed")?
    .context("Failed to train model")?;

    timer.checkpoint("model trained");
    model
        .save(&output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;
    timer.finish_with_count(model.training_samples);

    println!(
        "{}",
        format_success(&format!(
            "Trained on {} samples: {} labels, {} terms -> {}",
            model.training_samples,
            model.labels().len(),
            model.vocabulary_size(),
            output.display()
        ))
    );
    println!("  Labels: {}", model.labels().join(", "));

    Ok(())
}

async fn cmd_evaluate(config: &Config, data: Option<PathBuf>, test_ratio: f64) -> Result<()> {
    let data = data.unwrap_or_else(|| config.classifier.training_dir.clone());
    Validator::validate_directory(&data)?;
    Validator::validate_test_ratio(test_ratio)?;

    let vectorizer = config.classifier.vectorizer.clone();
    let forest = config.classifier.forest.clone();
    let registry = ExtractorRegistry::from_config(&config.extraction);

    let report = tokio::task::spawn_blocking(move || {
        let samples = load_training_dir(&data, &registry)?;
        train_and_evaluate(&samples, test_ratio, vectorizer, &forest)
    })
    .await
    .context("Evaluation task failed")?
    .context("Failed to evaluate model")?;

    println!("\n{}", report.format());
    Ok(())
}

fn cmd_stats(config: &Config) -> Result<()> {
    info!("Gathering statistics");

    let ledger = Ledger::load(&config.pipeline.ledger_path).context("Failed to read ledger")?;
    if ledger.is_empty() {
        println!("{}", format_info("Ledger is empty; run `ingest` first"));
        return Ok(());
    }

    let stats = ledger.stats();
    println!("\n{}", stats.format());
    if stats.failed() > 0 {
        println!(
            "{}",
            format_warning(&format!("{} document(s) failed processing", stats.failed()))
        );
    }

    Ok(())
}

fn cmd_export(
    config: &Config,
    output: PathBuf,
    pretty: bool,
    label: Option<String>,
) -> Result<()> {
    info!("Initializing JSON export");
    if let Some(label) = &label {
        Validator::validate_label(label)?;
    }

    let ledger = Ledger::load(&config.pipeline.ledger_path).context("Failed to read ledger")?;
    let exporter = JsonExporter::new(&output)?;
    let manifest = exporter.export(&ledger.documents(), label.as_deref(), pretty)?;

    println!(
        "{}",
        format_success(&format!(
            "Exported {} document(s) to {}",
            manifest.total_documents,
            output.display()
        ))
    );
    Ok(())
}

async fn cmd_verify(config: &Config) -> Result<()> {
    info!("Verifying installation");

    let config = config.clone();
    let report = tokio::task::spawn_blocking(move || check_installation(&config))
        .await
        .context("Verification task failed")?;

    println!("\n{}", report.format());

    if !report.is_healthy() {
        println!("{}", format_error("Installation has blocking problems"));
        anyhow::bail!("Verification failed");
    }

    Ok(())
}

//! COPA pipeline CLI
//!
//! Cleans raw case records, trains the outcome classifier and writes every
//! report and the combination table, as configured.

use anyhow::{Context, Result};
use clap::Parser;
use copa_core::PipelineConfig;
use copa_trainer::pipeline;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "copa-pipeline")]
#[command(author = "COPA Pipeline Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean COPA case records and model complaint findings", long_about = None)]
struct Args {
    /// TOML configuration file
    config: PathBuf,

    /// Skip cleaning; read the existing cleaned table
    #[arg(long)]
    skip_clean: bool,

    /// Skip training, evaluation and combination scoring
    #[arg(long)]
    skip_model: bool,

    /// Do not build the combination table
    #[arg(long)]
    no_app_data: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;

    info!("COPA pipeline v{}", copa_trainer::VERSION);

    let mut config = PipelineConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;

    if args.skip_clean {
        config.flags.clean = false;
    }
    if args.skip_model {
        config.flags.model = false;
    }
    if args.no_app_data {
        config.flags.app_data = false;
    }

    let summary = pipeline::run(&config).context("Pipeline failed")?;

    if let Some(rows) = summary.cleaned_rows {
        info!("  Cleaned rows: {}", rows);
    }
    if let Some(outcome) = &summary.model {
        info!("  Model: {} ({})", config.paths.model.display(), outcome.model_hash);
        info!("  Trees: {}", outcome.model.num_trees());
        if let Some(acc) = outcome.evaluation.overall_accuracy {
            info!("  Accuracy: {:.4}", acc);
        }
        for (metric, reason) in &outcome.evaluation.failures {
            info!("  Skipped {}: {}", metric, reason);
        }
        if let Some(rows) = outcome.combinations {
            info!("  Combinations: {} rows", rows);
        }
    }

    Ok(())
}

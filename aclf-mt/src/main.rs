//! Model Trainer (aclf-mt) - Main entry point
//!
//! Scans a labeled dataset directory, fits the classifier and writes the
//! model artifact consumed by aclf-ps.

use std::path::PathBuf;

use aclf_common::config::{self, TomlConfig, DEFAULT_DATASET_PATH};
use aclf_common::model::{SvmParams, DEFAULT_MODEL_PATH};
use aclf_common::ExtractorConfig;
use aclf_mt::Trainer;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for aclf-mt
#[derive(Parser, Debug)]
#[command(name = "aclf-mt")]
#[command(about = "Train the audio clip classifier from a labeled directory")]
#[command(version)]
struct Args {
    /// Dataset root: one sub-directory of clips per label
    #[arg(short, long, env = "ACLF_DATASET")]
    dataset: Option<PathBuf>,

    /// Where to write the model artifact
    #[arg(short, long, env = "ACLF_MODEL_PATH")]
    output: Option<PathBuf>,

    /// SVC soft-margin penalty
    #[arg(long, default_value_t = 1.0)]
    c: f64,

    /// TOML config file
    #[arg(long, env = "ACLF_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let level = toml_config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("aclf_mt={level},aclf_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dataset = config::resolve(
        args.dataset,
        toml_config.dataset_path,
        PathBuf::from(DEFAULT_DATASET_PATH),
    );
    let output = config::resolve(
        args.output,
        toml_config.model_path,
        PathBuf::from(DEFAULT_MODEL_PATH),
    );

    info!("Starting aclf-mt v{}", env!("CARGO_PKG_VERSION"));
    info!("Dataset: {}", dataset.display());
    info!("Output: {}", output.display());

    let params = SvmParams {
        c: args.c,
        ..Default::default()
    };
    let trainer = Trainer::new(ExtractorConfig::default(), params)
        .context("Invalid training parameters")?;

    let report = trainer
        .train(&dataset, &output)
        .with_context(|| format!("Training on {} failed", dataset.display()))?;

    println!("{}", report);
    println!("Model trained & saved");
    Ok(())
}

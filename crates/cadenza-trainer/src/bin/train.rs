//! Train a phone duration model from alignment corpora.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cadenza_trainer::{run_training, LossKind, ScheduleKind, TrainerConfig};
use tracing::{error, info, Level};

/// CLI arguments
#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train a phone duration model")]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training alignment corpus
    #[arg(long)]
    train_file: Option<PathBuf>,

    /// Validation alignment corpus
    #[arg(long)]
    dev_file: Option<PathBuf>,

    /// Batch capacity
    #[arg(long)]
    max_len: Option<usize>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    #[arg(short, long)]
    epochs: Option<usize>,

    /// Gradient norm threshold, 0 disables clipping
    #[arg(long)]
    gradclip: Option<f64>,

    #[arg(long)]
    lr: Option<f64>,

    /// Learning-rate schedule (noam or constant)
    #[arg(long, value_parser = parse_schedule)]
    schedule: Option<ScheduleKind>,

    /// Loss function (l1 or mse)
    #[arg(long, value_parser = parse_loss)]
    loss: Option<LossKind>,

    /// Directory for checkpoints
    #[arg(short = 'o', long)]
    checkpoint_dir: Option<PathBuf>,

    /// Weights to start from
    #[arg(long)]
    init_model: Option<PathBuf>,

    /// JSON-lines file for per-epoch losses
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// cpu, cuda[:N] or metal[:N]
    #[arg(short, long)]
    device: Option<String>,

    /// Log every training step
    #[arg(short, long)]
    verbose: bool,
}

fn parse_schedule(s: &str) -> std::result::Result<ScheduleKind, String> {
    match s.to_lowercase().as_str() {
        "noam" => Ok(ScheduleKind::Noam),
        "constant" => Ok(ScheduleKind::Constant),
        other => Err(format!("unknown schedule {other:?}")),
    }
}

fn parse_loss(s: &str) -> std::result::Result<LossKind, String> {
    match s.to_lowercase().as_str() {
        "l1" => Ok(LossKind::L1),
        "mse" | "l2" => Ok(LossKind::Mse),
        other => Err(format!("unknown loss {other:?}")),
    }
}

fn build_config(cli: Cli) -> Result<TrainerConfig> {
    let mut config = match &cli.config {
        Some(path) => TrainerConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => TrainerConfig::default(),
    };

    if let Some(v) = cli.train_file {
        config.train_file = v;
    }
    if let Some(v) = cli.dev_file {
        config.dev_file = v;
    }
    if let Some(v) = cli.max_len {
        config.max_len = v;
    }
    if let Some(v) = cli.batch_size {
        config.batch_size = v;
    }
    if let Some(v) = cli.epochs {
        config.epochs = v;
    }
    if let Some(v) = cli.gradclip {
        config.gradclip = v;
    }
    if let Some(v) = cli.lr {
        config.learning_rate = v;
    }
    if let Some(v) = cli.schedule {
        config.lr_schedule = v;
    }
    if let Some(v) = cli.loss {
        config.loss = v;
    }
    if let Some(v) = cli.checkpoint_dir {
        config.checkpoint_dir = v;
    }
    if cli.init_model.is_some() {
        config.init_model = cli.init_model;
    }
    if cli.metrics_file.is_some() {
        config.metrics_file = cli.metrics_file;
    }
    if let Some(v) = cli.device {
        config.device = v;
    }

    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let result = build_config(cli).and_then(|config| run_training(&config));
    match result {
        Ok(summary) => {
            info!(
                epochs = summary.history.len(),
                best_dev_loss = summary.best_dev_loss,
                "done"
            );
        }
        Err(e) => {
            error!("Training failed: {e:#}");
            std::process::exit(1);
        }
    }
}

//! Compress a frame alignment corpus into (phone, duration) JSON lines.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cadenza_core::{DurationDataset, SequenceCompressor, SILENCE_LABEL};
use tracing::info;

/// CLI arguments
#[derive(Parser)]
#[command(name = "compress")]
#[command(about = "Run-length encode an alignment corpus")]
#[command(version)]
struct Cli {
    /// Alignment corpus, one `<id> <label>...` line per utterance
    input: PathBuf,

    /// Output JSON-lines file
    output: PathBuf,

    /// Label trimmed from utterance boundaries
    #[arg(long, default_value_t = SILENCE_LABEL)]
    silence: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let compressor = SequenceCompressor::new().with_silence_label(cli.silence);
    let dataset = DurationDataset::from_file_with(&cli.input, &compressor)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);
    for seq in &dataset {
        serde_json::to_writer(&mut out, seq)?;
        writeln!(out)?;
    }
    out.flush()?;

    info!(
        retained = dataset.len(),
        dropped = dataset.dropped(),
        output = %cli.output.display(),
        "compressed corpus"
    );
    Ok(())
}

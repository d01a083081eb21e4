//! nat-gold - Gold-standard aggregation and model scoring

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nat_gold::compare::{load_gold_standard, load_model_annotations};
use nat_gold::spans::DEFAULT_PAD;
use nat_gold::{build_gold_standard, collect_spans, compare, load_submissions};

#[derive(Parser, Debug)]
#[command(name = "nat-gold")]
#[command(about = "Build a gold standard from worker submissions and score model annotations")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate submissions into a gold standard
    Aggregate {
        /// Submission files or directories of *.json submissions
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Where to write the gold standard
        #[arg(short, long, default_value = "gold_standard_output.json")]
        output: PathBuf,

        /// Context tokens kept around each span intersection
        #[arg(long, default_value_t = DEFAULT_PAD)]
        pad: usize,
    },
    /// Score model annotations against a gold standard
    Compare {
        /// Model annotations (JSON array, or CSV with text,category,subcategory)
        #[arg(long)]
        model: PathBuf,

        /// Gold standard written by `aggregate`
        #[arg(long)]
        gold: PathBuf,

        #[arg(short, long, default_value = "annotation_comparison_results.json")]
        output: PathBuf,
    },
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Args::parse().command {
        Command::Aggregate { inputs, output, pad } => {
            let submissions = load_submissions(&inputs).context("Failed to load submissions")?;
            let spans = collect_spans(&submissions);
            let gold = build_gold_standard(&spans, pad);

            let total: usize = gold.values().map(Vec::len).sum();
            write_json(&output, &gold)?;
            info!(
                "Gold standard: {} spans across {} articles saved to {}",
                total,
                gold.len(),
                output.display()
            );
        }
        Command::Compare { model, gold, output } => {
            let annotations = load_model_annotations(&model).context("Failed to load model annotations")?;
            let gold = load_gold_standard(&gold).context("Failed to load gold standard")?;

            let report = compare(&annotations, &gold);
            write_json(&output, &report)?;
            info!(
                "precision={} recall={} f1={} ({}/{} matched, {} gold); results saved to {}",
                report.precision,
                report.recall,
                report.f1,
                report.correct_matches,
                report.total_llm,
                report.total_gold,
                output.display()
            );
        }
    }

    Ok(())
}

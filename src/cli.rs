//! CLI argument parsing for the enrichment tool.
use crate::search::ProviderKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "car-enrich",
    version,
    about = "Attach a high-resolution photo and a color label to every vehicle in a JSON dataset",
    after_help = "Examples:\n  car-enrich run --dataset cars.json\n  car-enrich run --dataset cars.json --start 120 --end 400 --provider google\n  car-enrich status --dataset cars.json --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Status(StatusArgs),
}

/// Run command inputs.
#[derive(Parser, Debug)]
#[command(about = "Enrich a range of records, persisting after every success")]
pub struct RunArgs {
    /// JSON array of vehicle records, rewritten in place
    #[arg(long, value_name = "FILE")]
    pub dataset: PathBuf,

    /// First record to process (1-based, inclusive)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub start: usize,

    /// Last record to process (1-based, inclusive); defaults to the last record
    #[arg(long, value_name = "N")]
    pub end: Option<usize>,

    /// Search provider, repeat to build a fallback chain in order
    #[arg(long = "provider", value_name = "NAME", value_enum)]
    pub providers: Vec<ProviderKind>,

    /// Candidates taken from each provider per record
    #[arg(long, value_name = "K")]
    pub max_candidates: Option<usize>,

    /// Per-request HTTP timeout
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Also compute colors for records that have an image but no color
    #[arg(long)]
    pub backfill_colors: bool,

    /// Optional JSON config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the run summary here as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Append one JSONL entry per run here
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Remove a stale dataset lock left by a killed run
    #[arg(long)]
    pub force_unlock: bool,

    /// Emit the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Log candidate-level detail
    #[arg(long)]
    pub verbose: bool,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Summarize enrichment progress of a dataset")]
pub struct StatusArgs {
    /// JSON array of vehicle records
    #[arg(long, value_name = "FILE")]
    pub dataset: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

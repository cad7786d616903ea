// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Reconcile overlapping repository traffic snapshots into one continuous
/// history, and rank top referrers and paths.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the fragment and snapshot CSV files written by
    /// the fetch job
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Path of the reconciled aggregate CSV. Read as prior history when it
    /// exists, then rewritten atomically
    #[arg(short, long)]
    pub output: PathBuf,

    /// Read prior history from this file instead of --output
    #[arg(long)]
    pub previous: Option<PathBuf>,

    /// Number of entries in the top-referrer and top-path rankings
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Upper bound on the number of points in the plot-resolution series
    #[arg(long, default_value_t = 120)]
    pub max_points: usize,

    /// Directory for per-entity day-resolution CSV files (skipped if unset)
    #[arg(long)]
    pub resampled_dir: Option<PathBuf>,

    /// Logging verbosity (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

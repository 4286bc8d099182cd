//! Command-line parsing for the `arxid` identification tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! identification code; `app` turns these structs into library options.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{DEFAULT_SAMPLING_INTERVAL, DEFAULT_TRANSIENT_FRACTION, MAX_ORDER};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "arxid", version, about = "ARX system identification from sampled input/output data")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Identify an ARX model from a CSV/JSON capture, report candidates and optionally export.
    Identify(IdentifyArgs),
    /// Generate a synthetic capture from a known ARX plant.
    Simulate(SimulateArgs),
    /// Run the recursive estimator over a capture and print the final estimate.
    Track(TrackArgs),
}

/// Options for `arxid identify`.
#[derive(Debug, Parser, Clone)]
pub struct IdentifyArgs {
    /// Capture file (CSV with headers, or a JSON array of objects).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Evaluate orders 1..=N.
    #[arg(long, default_value_t = MAX_ORDER)]
    pub max_order: usize,

    /// Evaluate only this order.
    #[arg(long)]
    pub order: Option<usize>,

    /// Leading share of samples discarded as start-up transient.
    #[arg(long, default_value_t = DEFAULT_TRANSIENT_FRACTION)]
    pub transient: f64,

    /// Ask the external advisor (configured via ARX_ADVISOR_* env vars) to choose the model.
    #[arg(long)]
    pub advisory: bool,

    /// Advisory time budget in milliseconds.
    #[arg(long, default_value_t = crate::fit::DEFAULT_ADVISORY_TIMEOUT.as_millis() as u64)]
    pub advisory_timeout_ms: u64,

    /// Print the result as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,

    /// Render an ASCII plot of measured vs simulated output.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Write the chosen model to a JSON file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

/// Options for `arxid simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// AR coefficients a1..an.
    #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
    pub a: Vec<f64>,

    /// Input coefficients b0..bn (one more than `--a`).
    #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
    pub b: Vec<f64>,

    /// Number of samples to generate.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub samples: usize,

    /// Sampling interval in seconds.
    #[arg(long, default_value_t = DEFAULT_SAMPLING_INTERVAL)]
    pub interval: f64,

    /// Output noise standard deviation (normalized units).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Destination CSV file.
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,
}

/// Options for `arxid track`.
#[derive(Debug, Parser, Clone)]
pub struct TrackArgs {
    /// Capture file (CSV or JSON).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Model order.
    #[arg(long, default_value_t = 1)]
    pub order: usize,

    /// Forgetting factor.
    #[arg(long, default_value_t = crate::fit::DEFAULT_FORGETTING)]
    pub lambda: f64,
}

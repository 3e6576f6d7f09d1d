use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::OutputFormat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "cloudsweep",
    version,
    long_version = LONG_VERSION,
    about = "Cloud account hygiene auditor with bounded-concurrency resource scanning"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit an account inventory and print the report
    Run(RunArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
    /// List the known region codes
    Regions,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Account inventory to audit (YAML or JSON)
    #[arg(short, long)]
    pub inventory: PathBuf,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Region to audit; overrides the config file and the inventory
    #[arg(short, long)]
    pub region: Option<String>,

    /// Comma-separated audits to run (e.g. snapshots,s3,subnets)
    #[arg(long)]
    pub checks: Option<String>,

    /// Maximum resources examined per sampled audit
    #[arg(long)]
    pub sample_cap: Option<usize>,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Concurrent checks per scan
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Also write the JSON report to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Path to configuration file
    pub config: PathBuf,
}

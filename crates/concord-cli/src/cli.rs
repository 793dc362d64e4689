//! CLI command definitions and argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Concord - collaborative scoring from pairwise comparisons.
#[derive(Debug, Parser)]
#[command(name = "concord")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format of the summary printed on stdout
    #[arg(short, long, value_enum, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log at debug level
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Summary output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    Table,
    /// JSON document
    Json,
    /// Nothing on success
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full scoring pipeline on an input directory
    Run(RunArgs),

    /// Print the effective pipeline configuration as YAML
    Config(ConfigArgs),

    /// Check the input files without computing anything
    Validate(ValidateArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Directory holding users.csv, comparisons.csv and optional inputs
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving the output tables
    #[arg(short, long)]
    pub output: PathBuf,

    /// Pipeline configuration file (.yaml, .yml, .toml or .json)
    #[arg(short, long, env = "CONCORD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Named preset used when no configuration file is given
    #[arg(short, long, default_value = "default")]
    pub preset: String,

    /// Override the number of worker threads
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write every intermediate state under snapshots/
    #[arg(long)]
    pub snapshot: bool,

    /// Show the highest global scores of each criterion
    #[arg(short, long, default_value = "0")]
    pub top: usize,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Configuration file to resolve instead of a preset
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Named preset: default, fast or strict
    #[arg(short, long, default_value = "default")]
    pub preset: String,
}

/// Arguments for the validate command.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Directory holding the input files
    #[arg(short, long)]
    pub input: PathBuf,
}

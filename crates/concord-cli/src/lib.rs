//! Concord CLI library.
//!
//! Argument parsing, logging setup, command execution and summary
//! formatting for the `concord` binary.
//!
//! ```text
//! concord run --input data/ --output scores/ --config pipeline.yaml
//! concord config --preset strict > pipeline.yaml
//! concord validate --input data/
//! ```
//!
//! Logs go to stderr; stdout carries only the summary. A run that stops
//! because a solver did not converge exits with code 2, any other failure
//! with code 1.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::{Cli, Command, OutputFormat};
pub use error::{exit_code, CliError, Result, EXIT_FAILURE, EXIT_NON_CONVERGENCE, EXIT_SUCCESS};
pub use output::Formatter;

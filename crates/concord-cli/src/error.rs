//! Error types for the CLI application.

use concord_pipeline::PipelineError;
use concord_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code of a successful run
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code of any failure other than non-convergence
pub const EXIT_FAILURE: i32 = 1;

/// Exit code when a solver ran out of iterations
pub const EXIT_NON_CONVERGENCE: i32 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Input or output files
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Pipeline(e) if e.is_non_convergence() => EXIT_NON_CONVERGENCE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Exit code for an error reported at the binary boundary
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CliError>())
        .map_or(EXIT_FAILURE, CliError::exit_code)
}

//! Error types for collaborative scaling

use thiserror::Error;

/// Errors that can occur during Mehestan scaling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalingError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled
    #[error("Scaling cancelled")]
    Cancelled,
}

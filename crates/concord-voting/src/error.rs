//! Voting error types

use thiserror::Error;

/// Errors that can occur while assigning voting rights or aggregating
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VotingError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled
    #[error("Voting cancelled")]
    Cancelled,
}

//! Error types for preference learning

use thiserror::Error;

/// Errors that can occur while learning user models
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GbtError {
    /// The solver exceeded its iteration budget
    #[error("No convergence for user '{username}' on criterion '{criterion}' after {iterations} iterations")]
    NonConvergence {
        /// User whose model did not converge
        username: String,
        /// Criterion being learned
        criterion: String,
        /// Iterations performed
        iterations: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled
    #[error("Preference learning cancelled")]
    Cancelled,
}

//! Error types for pipeline runs

use concord_gbt::GbtError;
use concord_mehestan::ScalingError;
use concord_store::StoreError;
use concord_voting::VotingError;
use thiserror::Error;

/// Errors that can occur during a pipeline run
///
/// Step errors are folded into this taxonomy: cancellation of any step
/// becomes [`PipelineError::Cancelled`] and invalid step parameters become
/// [`PipelineError::Config`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Preference learning failed
    #[error("Preference learning failed: {0}")]
    PreferenceLearning(#[source] GbtError),

    /// Reading inputs or writing outputs failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The worker pool could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The run was cancelled; partial outputs were discarded
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether a solver ran out of iterations
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, PipelineError::PreferenceLearning(GbtError::NonConvergence { .. }))
    }
}

impl From<GbtError> for PipelineError {
    fn from(err: GbtError) -> Self {
        match err {
            GbtError::Cancelled => PipelineError::Cancelled,
            GbtError::Config(message) => PipelineError::Config(message),
            other => PipelineError::PreferenceLearning(other),
        }
    }
}

impl From<VotingError> for PipelineError {
    fn from(err: VotingError) -> Self {
        match err {
            VotingError::Cancelled => PipelineError::Cancelled,
            VotingError::Config(message) => PipelineError::Config(message),
        }
    }
}

impl From<ScalingError> for PipelineError {
    fn from(err: ScalingError) -> Self {
        match err {
            ScalingError::Cancelled => PipelineError::Cancelled,
            ScalingError::Config(message) => PipelineError::Config(message),
        }
    }
}

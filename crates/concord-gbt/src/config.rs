//! Configuration for preference learning

use serde::{Deserialize, Serialize};

use crate::error::GbtError;

/// MAP solver used for each (user, criterion)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Exact one-dimensional solves, one entity at a time
    #[default]
    CoordinateDescent,
    /// Limited-memory quasi-Newton on all scores jointly
    Lbfgs,
}

/// Configuration for generalized Bradley–Terry learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbtConfig {
    /// Standard deviation of the gaussian prior on each score
    pub prior_std_dev: f64,

    /// Increase of the negative log-likelihood that defines an uncertainty
    pub uncertainty_nll_increase: f64,

    /// Cap on each uncertainty; entities capped on both sides are dropped
    pub max_uncertainty: f64,

    /// Convergence threshold of the solver
    pub convergence_error: f64,

    /// Maximum full passes (coordinate descent) or iterations (L-BFGS)
    pub max_iter: usize,

    /// MAP solver
    pub solver: Solver,

    /// Number of correction pairs kept by L-BFGS
    pub lbfgs_history: usize,
}

impl Default for GbtConfig {
    fn default() -> Self {
        Self {
            prior_std_dev: 7.0,
            uncertainty_nll_increase: 1.0,
            max_uncertainty: 1e3,
            convergence_error: 1e-5,
            max_iter: 100,
            solver: Solver::CoordinateDescent,
            lbfgs_history: 10,
        }
    }
}

impl GbtConfig {
    /// Fast preset: looser convergence, L-BFGS
    pub fn fast() -> Self {
        Self {
            convergence_error: 1e-3,
            max_iter: 50,
            solver: Solver::Lbfgs,
            ..Self::default()
        }
    }

    /// Strict preset: tighter convergence and a larger iteration budget
    pub fn strict() -> Self {
        Self {
            convergence_error: 1e-8,
            max_iter: 1000,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), GbtError> {
        positive("prior_std_dev", self.prior_std_dev)?;
        positive("uncertainty_nll_increase", self.uncertainty_nll_increase)?;
        positive("max_uncertainty", self.max_uncertainty)?;
        positive("convergence_error", self.convergence_error)?;
        if self.max_iter == 0 {
            return Err(GbtError::Config("max_iter must be greater than 0".to_string()));
        }
        if self.lbfgs_history == 0 {
            return Err(GbtError::Config("lbfgs_history must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

fn positive(name: &str, value: f64) -> Result<(), GbtError> {
    if value.is_nan() || value <= 0.0 {
        return Err(GbtError::Config(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}

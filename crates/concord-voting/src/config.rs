//! Voting rights and aggregation configuration

use serde::{Deserialize, Serialize};

use crate::error::VotingError;

/// Configuration of affine-overtrust voting rights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Privacy weight of a private rating
    pub privacy_penalty: f64,

    /// Overtrust allowed on every entity
    pub min_overtrust: f64,

    /// Additional overtrust per unit of cumulative trust
    pub overtrust_ratio: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            privacy_penalty: 0.5,
            min_overtrust: 2.0,
            overtrust_ratio: 0.1,
        }
    }
}

impl VotingConfig {
    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<(), VotingError> {
        if !(0.0..=1.0).contains(&self.privacy_penalty) {
            return Err(VotingError::Config(format!(
                "privacy_penalty must be in [0, 1], got {}",
                self.privacy_penalty
            )));
        }
        non_negative("min_overtrust", self.min_overtrust)?;
        non_negative("overtrust_ratio", self.overtrust_ratio)?;
        Ok(())
    }
}

/// Configuration of the entitywise global aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Quantile of the users' scores taken as the global value
    pub quantile: f64,

    /// Quantile of the deviations reported as the right uncertainty
    pub dev_quantile: f64,

    /// Resilience of the aggregation
    pub lipschitz: f64,

    /// Value of an entity without voting rights
    pub default_value: f64,

    /// Deviation of an entity without voting rights
    pub default_dev: f64,

    /// Tolerance of the qr-aggregators
    pub error: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            quantile: 0.5,
            dev_quantile: 0.9,
            lipschitz: 0.1,
            default_value: 0.0,
            default_dev: 1.0,
            error: 1e-5,
        }
    }
}

impl AggregationConfig {
    /// More resilient aggregation with a tighter tolerance
    pub fn strict() -> Self {
        Self {
            lipschitz: 0.05,
            error: 1e-8,
            ..Self::default()
        }
    }

    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<(), VotingError> {
        open_unit("quantile", self.quantile)?;
        open_unit("dev_quantile", self.dev_quantile)?;
        if self.lipschitz.is_nan() || self.lipschitz <= 0.0 {
            return Err(VotingError::Config(format!("lipschitz must be positive, got {}", self.lipschitz)));
        }
        if self.error.is_nan() || self.error <= 0.0 {
            return Err(VotingError::Config(format!("error must be positive, got {}", self.error)));
        }
        non_negative("default_dev", self.default_dev)?;
        if !self.default_value.is_finite() {
            return Err(VotingError::Config(format!(
                "default_value must be finite, got {}",
                self.default_value
            )));
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), VotingError> {
    if value.is_nan() || value < 0.0 {
        return Err(VotingError::Config(format!("{} must be non-negative, got {}", name, value)));
    }
    Ok(())
}

fn open_unit(name: &str, value: f64) -> Result<(), VotingError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(VotingError::Config(format!("{} must be in (0, 1), got {}", name, value)));
    }
    Ok(())
}

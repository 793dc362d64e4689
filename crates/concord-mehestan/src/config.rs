//! Configuration for Mehestan scaling
//!
//! Resilience parameters, scaler selection thresholds and pair sampling
//! limits.

use serde::{Deserialize, Serialize};

use crate::error::ScalingError;

/// Configuration for Mehestan collaborative scaling
///
/// # Examples
///
/// ```
/// use concord_mehestan::MehestanConfig;
///
/// let config = MehestanConfig::default();
/// assert_eq!(config.lipschitz, 0.1);
/// assert_eq!(config.n_scalers_max, 100);
///
/// // Fewer sampled pairs, looser tolerance
/// let config = MehestanConfig::fast();
/// assert!(config.n_diffs_sample_max < MehestanConfig::default().n_diffs_sample_max);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MehestanConfig {
    /// Resilience of the cross-scaler aggregation; larger is more resilient
    /// but less accurate
    pub lipschitz: f64,

    /// Minimal activity to be selected as a scaler
    pub min_scaler_activity: f64,

    /// Maximal number of scalers per criterion
    pub n_scalers_max: usize,

    /// Weight of a privately rated entity
    pub privacy_penalty: f64,

    /// Resilience of the per-(scalee, scaler) aggregation
    pub user_comparison_lipschitz: f64,

    /// Exponent of the model norm that tempers large-scored users
    pub p_norm_for_multiplicative_resilience: f64,

    /// Above this many common entities, pairs are sampled instead of enumerated
    pub n_entity_to_fully_compare_max: usize,

    /// Number of sampled entity pairs per (scalee, scaler)
    pub n_diffs_sample_max: usize,

    /// Deviation reported for a multiplier without data
    pub default_multiplier_dev: f64,

    /// Deviation reported for a translation without data
    pub default_translation_dev: f64,

    /// Tolerance of the qr-aggregators
    pub error: f64,
}

impl Default for MehestanConfig {
    fn default() -> Self {
        Self {
            lipschitz: 0.1,
            min_scaler_activity: 10.0,
            n_scalers_max: 100,
            privacy_penalty: 0.5,
            user_comparison_lipschitz: 10.0,
            p_norm_for_multiplicative_resilience: 4.0,
            n_entity_to_fully_compare_max: 100,
            n_diffs_sample_max: 1000,
            default_multiplier_dev: 0.5,
            default_translation_dev: 1.0,
            error: 1e-5,
        }
    }
}

impl MehestanConfig {
    /// Cheaper configuration for large inputs
    ///
    /// - Fully compares at most 30 common entities
    /// - Samples 200 pairs beyond that
    /// - Tolerance 1e-4
    pub fn fast() -> Self {
        Self {
            n_entity_to_fully_compare_max: 30,
            n_diffs_sample_max: 200,
            error: 1e-4,
            ..Self::default()
        }
    }

    /// More resilient, more precise configuration
    ///
    /// - Lipschitz 0.05
    /// - Tolerance 1e-8
    pub fn strict() -> Self {
        Self {
            lipschitz: 0.05,
            error: 1e-8,
            ..Self::default()
        }
    }

    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<(), ScalingError> {
        positive("lipschitz", self.lipschitz)?;
        positive("user_comparison_lipschitz", self.user_comparison_lipschitz)?;
        positive("p_norm_for_multiplicative_resilience", self.p_norm_for_multiplicative_resilience)?;
        positive("default_multiplier_dev", self.default_multiplier_dev)?;
        positive("default_translation_dev", self.default_translation_dev)?;
        positive("error", self.error)?;
        if !(0.0..=1.0).contains(&self.privacy_penalty) {
            return Err(ScalingError::Config(format!(
                "privacy_penalty must be in [0, 1], got {}",
                self.privacy_penalty
            )));
        }
        if self.min_scaler_activity.is_nan() || self.min_scaler_activity < 0.0 {
            return Err(ScalingError::Config(format!(
                "min_scaler_activity must be non-negative, got {}",
                self.min_scaler_activity
            )));
        }
        if self.n_diffs_sample_max == 0 {
            return Err(ScalingError::Config("n_diffs_sample_max must be greater than 0".to_string()));
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

fn positive(name: &str, value: f64) -> Result<(), ScalingError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ScalingError::Config(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}

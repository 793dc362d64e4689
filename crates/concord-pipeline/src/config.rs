//! Pipeline configuration
//!
//! One section per step plus run-level options. Files may be YAML, TOML or
//! JSON; the format follows the file extension. Every field has a default,
//! so a partial file only overrides what it names.

use std::fs;
use std::path::Path;

use concord_gbt::GbtConfig;
use concord_mehestan::MehestanConfig;
use concord_voting::{AggregationConfig, VotingConfig};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Configuration of a full pipeline run
///
/// # Examples
///
/// ```
/// use concord_pipeline::PipelineConfig;
///
/// let config = PipelineConfig::from_yaml("seed: 7\nscaling:\n  lipschitz: 0.5\n").unwrap();
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.scaling.lipschitz, 0.5);
/// assert_eq!(config.scaling.n_scalers_max, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Generalized Bradley–Terry learning
    pub preference_learning: GbtConfig,

    /// Affine-overtrust voting rights
    pub voting_rights: VotingConfig,

    /// Mehestan scaling
    pub scaling: MehestanConfig,

    /// Global aggregation
    pub aggregation: AggregationConfig,

    /// Worker threads; 0 uses one per CPU
    pub max_workers: usize,

    /// Seed of coordinate ordering and pair sampling
    pub seed: u64,

    /// Write every intermediate state under `snapshots/`
    pub snapshot: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preference_learning: GbtConfig::default(),
            voting_rights: VotingConfig::default(),
            scaling: MehestanConfig::default(),
            aggregation: AggregationConfig::default(),
            max_workers: 0,
            seed: 0,
            snapshot: false,
        }
    }
}

impl PipelineConfig {
    /// Fast preset: looser convergence and fewer sampled pairs
    pub fn fast() -> Self {
        Self {
            preference_learning: GbtConfig::fast(),
            scaling: MehestanConfig::fast(),
            ..Self::default()
        }
    }

    /// Strict preset: tighter convergence and smaller lipschitz
    pub fn strict() -> Self {
        Self {
            preference_learning: GbtConfig::strict(),
            scaling: MehestanConfig::strict(),
            aggregation: AggregationConfig::strict(),
            ..Self::default()
        }
    }

    /// Preset by name: `default`, `fast` or `strict`
    pub fn preset(name: &str) -> Result<Self, PipelineError> {
        match name {
            "default" => Ok(Self::default()),
            "fast" => Ok(Self::fast()),
            "strict" => Ok(Self::strict()),
            other => Err(PipelineError::Config(format!(
                "Unknown preset '{}' (expected default, fast or strict)",
                other
            ))),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.preference_learning.validate()?;
        self.voting_rights.validate()?;
        self.scaling.validate()?;
        self.aggregation.validate()?;
        Ok(())
    }

    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("Cannot read {}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let config = match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => {
                return Err(PipelineError::Config(format!(
                    "Unsupported configuration format: {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML
    pub fn from_yaml(content: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(content).map_err(|e| PipelineError::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Parse TOML
    pub fn from_toml(content: &str) -> Result<Self, PipelineError> {
        toml::from_str(content).map_err(|e| PipelineError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Parse JSON
    pub fn from_json(content: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(content).map_err(|e| PipelineError::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, PipelineError> {
        serde_yaml::to_string(self).map_err(|e| PipelineError::Config(format!("Failed to serialize to YAML: {}", e)))
    }
}

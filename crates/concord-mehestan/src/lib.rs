//! Concord Mehestan Scaling
//!
//! Lipschitz-resilient collaborative scaling of user models.
//!
//! # Overview
//!
//! Users express their preferences on their own scale: one user's 2.0 can be
//! another's 10.0. Mehestan appends to each user's model, per criterion, a
//! multiplier and then a translation so that scaled scores become
//! comparable across users.
//!
//! - **Scaler selection**: users are ranked by activity
//!   (`trust × Σ privacy penalty` over scored entities); the top
//!   `n_scalers_max` reaching `min_scaler_activity` become scalers
//! - **Pass 1**: scalers are scaled against each other
//! - **Pass 2**: the other users are fitted to the scaled scalers
//!
//! Every aggregation is a quadratically regularized median, so a single
//! user can move another user's scale by a bounded amount only.
//!
//! # Configuration Presets
//!
//! ```
//! use concord_mehestan::MehestanConfig;
//!
//! // Default: lipschitz 0.1, up to 100 scalers, 1000 sampled pairs
//! let config = MehestanConfig::default();
//!
//! // Fast: fewer compared and sampled pairs
//! let config = MehestanConfig::fast();
//!
//! // Strict: more resilient, tighter tolerance
//! let config = MehestanConfig::strict();
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [scaling]
//! lipschitz = 0.1
//! min_scaler_activity = 10.0
//! n_scalers_max = 100
//! privacy_penalty = 0.5
//! user_comparison_lipschitz = 10.0
//! p_norm_for_multiplicative_resilience = 4.0
//! n_entity_to_fully_compare_max = 100
//! n_diffs_sample_max = 1000
//! default_multiplier_dev = 0.5
//! default_translation_dev = 1.0
//! error = 1e-5
//! ```

#![warn(missing_docs)]

mod activity;
mod config;
mod error;
mod mehestan;
mod pairs;
mod scales;

pub use activity::{model_norm, select_scalers, user_activity};
pub use config::MehestanConfig;
pub use error::ScalingError;
pub use mehestan::{CriterionScales, Mehestan};
pub use scales::{Scale, UserScores};

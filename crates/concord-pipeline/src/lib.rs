//! Concord Pipeline
//!
//! Composes the scoring steps into one run:
//!
//! 1. **Preference learning**: per-user generalized Bradley–Terry scores
//! 2. **Voting rights**: affine-overtrust voting rights per entity
//! 3. **Scaling**: Mehestan multipliers and translations per user
//! 4. **Aggregation**: global scores from scaled user scores
//!
//! Each step is a pure `State → State` function. The [`Sequential`] runs
//! them in a bounded worker pool, optionally snapshots each intermediate
//! state, and reports [`RunMetrics`].
//!
//! # Configuration
//!
//! ```yaml
//! max_workers: 4
//! seed: 0
//! snapshot: false
//! preference_learning:
//!   prior_std_dev: 7.0
//!   solver: coordinate_descent
//! voting_rights:
//!   min_overtrust: 2.0
//! scaling:
//!   lipschitz: 0.1
//! aggregation:
//!   quantile: 0.5
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod sequential;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use metrics::{RunMetrics, StepTiming};
pub use sequential::{PipelineRun, Sequential, RUN_METRICS_FILE};

//! Concord Preference Learning
//!
//! Learns each contributor's per-criterion scores from their pairwise
//! comparisons with a generalized Bradley–Terry model.
//!
//! # Overview
//!
//! For a user and a criterion, every comparison `(left, right, r)` with
//! normalized value `r` contributes `ψ(θ_l - θ_r) - r·(θ_l - θ_r)` to the
//! negative log-likelihood, where ψ is the cumulant-generating function of
//! the root law. A gaussian prior keeps scores centred. The MAP is found by
//! coordinate descent (default) or L-BFGS, then each entity gets a left and
//! right uncertainty from a fixed increase of the negative log-likelihood.
//!
//! # Architecture
//!
//! ```text
//! Comparisons → Problem → Solver → MAP → Uncertainties → UserModels
//! ```
//!
//! # Example Usage
//!
//! ```
//! use concord_domain::{Comparison, Comparisons, MadePublic, State, StateFunction, Users};
//! use concord_gbt::{GbtConfig, PreferenceLearner};
//!
//! let mut comparisons = Comparisons::new();
//! comparisons.add("alice", "importance", "a", "b", Comparison::new(-5.0, 10.0).unwrap());
//! let state = State::from_inputs(Users::new(), comparisons, MadePublic::all_public());
//!
//! let learner = PreferenceLearner::new(GbtConfig::default());
//! let learned = learner.apply(&state).unwrap();
//!
//! let model = learned.user_models.get("alice").unwrap();
//! let a = model.direct("a", "importance").unwrap();
//! let b = model.direct("b", "importance").unwrap();
//! assert!(a.value > b.value);
//! ```

#![warn(missing_docs)]

mod config;
mod coordinate_descent;
mod error;
mod lbfgs;
mod learner;
mod problem;
mod root_law;
mod uncertainty;

#[cfg(test)]
mod tests;

pub use config::{GbtConfig, Solver};
pub use coordinate_descent::NotConverged;
pub use error::GbtError;
pub use learner::{LearnedScores, PreferenceLearner};
pub use root_law::{RootLaw, UniformGbt};

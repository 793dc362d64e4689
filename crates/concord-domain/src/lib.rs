//! Concord Domain Layer
//!
//! This crate contains the data model and numerical core of Concord. It has
//! ZERO external dependencies and defines the value objects, indexed tables,
//! robust aggregation primitives and the pipeline-step trait that all other
//! crates depend upon.
//!
//! ## Key Concepts
//!
//! - **Score**: a value with asymmetric left/right uncertainties, closed under interval arithmetic
//! - **MultiKeyTable**: a sparse tensor indexed by named string keys, with cached key orders
//! - **Comparison**: a contributor's bounded judgement between two entities
//! - **ScoringModel**: direct scores plus an ordered list of scalings
//! - **qr primitives**: quadratically regularized, Lipschitz-resilient estimators
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - No I/O and no logging
//! - Pipeline steps implement [`traits::StateFunction`] in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod entities;
pub mod model;
pub mod resilient;
pub mod score;
pub mod seed;
pub mod solver;
pub mod state;
pub mod table;
pub mod traits;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use entities::{
    Assessment, Assessments, Comparison, Comparisons, Entities, MadePublic, User, Users, Vouch,
    ASSESSMENT_KEYNAMES,
};
pub use model::{MultiScore, Scaling, ScalingKind, ScoringModel, UserModels, VotingRights};
pub use resilient::WeightedScores;
pub use score::Score;
pub use state::{EntityVotingStats, ScalerStats, State};
pub use table::{MultiKeyTable, NestedDict, TableValue};
pub use traits::StateFunction;

//! Concord Voting
//!
//! Voting rights and global aggregation.
//!
//! The voting rights step gives every evaluator of an (entity, criterion)
//! a voting right of at least their trust, and lifts untrusted evaluators
//! to a common floor while keeping the total overtrust affinely bounded.
//! The aggregation step combines the users' scaled scores into one global
//! score per entity with a qr-quantile weighted by those voting rights.
//!
//! # Examples
//!
//! ```
//! use concord_domain::{State, StateFunction};
//! use concord_voting::{AffineOvertrust, AggregationConfig, EntitywiseQrQuantile, VotingConfig};
//!
//! let state = State::default();
//! let state = AffineOvertrust::new(VotingConfig::default()).apply(&state).unwrap();
//! let state = EntitywiseQrQuantile::new(AggregationConfig::default()).apply(&state).unwrap();
//! assert!(state.voting_rights.is_empty());
//! ```

#![warn(missing_docs)]

mod aggregation;
mod config;
mod error;
mod overtrust;

pub use aggregation::EntitywiseQrQuantile;
pub use config::{AggregationConfig, VotingConfig};
pub use error::VotingError;
pub use overtrust::{AffineOvertrust, Allocation};

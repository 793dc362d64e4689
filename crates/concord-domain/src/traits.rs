//! Trait definitions for pipeline steps
//!
//! Steps are implemented in the application crates (concord-gbt,
//! concord-voting, concord-mehestan) and composed by concord-pipeline.

use crate::state::State;

/// A pure pipeline step: reads a state, returns a new one
pub trait StateFunction {
    /// Error type for the step
    type Error;

    /// Short step name, used for logs and snapshot directories
    fn name(&self) -> &'static str;

    /// Compute the next state
    fn apply(&self, state: &State) -> Result<State, Self::Error>;
}

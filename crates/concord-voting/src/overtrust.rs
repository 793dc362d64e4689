//! Affine-overtrust voting rights
//!
//! On each (entity, criterion), every evaluator receives at least a uniform
//! floor `r*`, chosen as large as possible while the total overtrust stays
//! below `min_overtrust + overtrust_ratio × cumulative_trust`.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use concord_domain::solver::dichotomy;
use concord_domain::state::VOTING_STATISTICS_KEYNAMES;
use concord_domain::traits::StateFunction;
use concord_domain::{CancelToken, EntityVotingStats, MultiKeyTable, State, VotingRights};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::VotingConfig;
use crate::error::VotingError;

const FLOOR_TOLERANCE: f64 = 1e-9;

/// Voting rights of one (entity, criterion)
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Voting right of each evaluator, in input order
    pub voting_rights: Vec<f64>,
    /// Cumulative trust, floor and overtrust
    pub statistics: EntityVotingStats,
}

/// Assigns voting rights with an affinely bounded overtrust
///
/// # Examples
///
/// ```
/// use concord_voting::{AffineOvertrust, VotingConfig};
///
/// let overtrust = AffineOvertrust::new(VotingConfig::default());
/// let allocation = overtrust.allocate(&[0.0, 0.0, 1.0], &[1.0, 1.0, 1.0]);
///
/// // Untrusted evaluators get the floor, trusted ones keep their trust
/// assert_eq!(allocation.voting_rights[0], allocation.statistics.min_voting_right);
/// assert_eq!(allocation.voting_rights[2], 1.0);
/// assert!(allocation.statistics.overtrust <= 2.0 + 0.1 * 1.0 + 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct AffineOvertrust {
    config: VotingConfig,
    cancel: Option<CancelToken>,
}

impl AffineOvertrust {
    /// Create the voting rights step
    pub fn new(config: VotingConfig) -> Self {
        Self { config, cancel: None }
    }

    /// Stop between tasks once `token` is cancelled
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Overtrust allowed for a given cumulative trust
    pub fn maximal_overtrust(&self, cumulative_trust: f64) -> f64 {
        self.config.min_overtrust + self.config.overtrust_ratio * cumulative_trust
    }

    /// Voting rights of evaluators with the given trusts and privacy weights
    ///
    /// # Panics
    /// Panics if the slices differ in length
    pub fn allocate(&self, trusts: &[f64], privacy_weights: &[f64]) -> Allocation {
        assert_eq!(trusts.len(), privacy_weights.len(), "trusts and weights must align");

        let cumulative_trust: f64 = trusts.iter().zip(privacy_weights).map(|(t, w)| t * w).sum();
        let max_overtrust = self.maximal_overtrust(cumulative_trust);
        let min_voting_right = if overtrust(1.0, trusts, privacy_weights) <= max_overtrust {
            1.0
        } else {
            dichotomy(
                |floor| overtrust(floor, trusts, privacy_weights) > max_overtrust,
                0.0,
                1.0,
                FLOOR_TOLERANCE,
            )
        };

        let voting_rights: Vec<f64> = trusts
            .iter()
            .zip(privacy_weights)
            .map(|(t, w)| w * t.max(min_voting_right))
            .collect();
        let total: f64 = voting_rights.iter().sum();

        Allocation {
            voting_rights,
            statistics: EntityVotingStats {
                cumulative_trust,
                min_voting_right,
                overtrust: total - cumulative_trust,
            },
        }
    }

    fn check_cancelled(&self) -> Result<(), VotingError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(VotingError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Overtrust when every evaluator gets at least `floor`
fn overtrust(floor: f64, trusts: &[f64], privacy_weights: &[f64]) -> f64 {
    trusts
        .iter()
        .zip(privacy_weights)
        .filter(|(t, _)| floor > **t)
        .map(|(t, w)| w * (floor - t))
        .sum()
}

/// `(criterion, entity_name) → evaluators` from comparisons and assessments
fn evaluators(state: &State) -> BTreeMap<(String, String), BTreeSet<String>> {
    let mut evaluators: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for (keys, _) in state.comparisons.iter() {
        let (username, criterion) = (&keys[0], &keys[1]);
        for entity_name in &keys[2..4] {
            evaluators
                .entry((criterion.clone(), entity_name.clone()))
                .or_default()
                .insert(username.clone());
        }
    }
    for (keys, _) in state.assessments.iter() {
        let (username, criterion, entity_name) = (&keys[0], &keys[1], &keys[2]);
        evaluators
            .entry((criterion.clone(), entity_name.clone()))
            .or_default()
            .insert(username.clone());
    }
    evaluators
}

impl StateFunction for AffineOvertrust {
    type Error = VotingError;

    fn name(&self) -> &'static str {
        "voting_rights"
    }

    fn apply(&self, state: &State) -> Result<State, VotingError> {
        self.config.validate()?;
        let start = Instant::now();

        let slices: Vec<((String, String), Vec<String>)> = evaluators(state)
            .into_iter()
            .map(|(key, users)| (key, users.into_iter().collect()))
            .collect();

        let allocations: Vec<Allocation> = slices
            .par_iter()
            .map(|((_, entity_name), usernames)| {
                self.check_cancelled()?;
                let trusts: Vec<f64> = usernames.iter().map(|u| state.users.trust(u)).collect();
                let weights: Vec<f64> = usernames
                    .iter()
                    .map(|u| state.made_public.penalty(self.config.privacy_penalty, u, entity_name))
                    .collect();
                Ok(self.allocate(&trusts, &weights))
            })
            .collect::<Result<_, VotingError>>()?;

        let mut voting_rights = VotingRights::new();
        let mut statistics = MultiKeyTable::new(&VOTING_STATISTICS_KEYNAMES);
        for (((criterion, entity_name), usernames), allocation) in slices.iter().zip(allocations) {
            for (username, voting_right) in usernames.iter().zip(&allocation.voting_rights) {
                voting_rights.set(username, entity_name, criterion, *voting_right);
            }
            debug!(
                "'{}' on '{}': {} evaluators, floor {:.4}, overtrust {:.4}",
                entity_name,
                criterion,
                usernames.len(),
                allocation.statistics.min_voting_right,
                allocation.statistics.overtrust
            );
            statistics.insert(&[entity_name.as_str(), criterion.as_str()], allocation.statistics);
        }

        info!(
            "Voting rights: {} (entity, criterion) slices, {} rights in {:.2}s",
            slices.len(),
            voting_rights.len(),
            start.elapsed().as_secs_f64()
        );

        let mut next = state.clone();
        next.voting_rights = voting_rights;
        next.voting_statistics = statistics;
        Ok(next)
    }
}

//! Preference learning step

use std::time::Instant;

use concord_domain::seed::task_seed;
use concord_domain::traits::StateFunction;
use concord_domain::{CancelToken, Comparison, Score, State, UserModels};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{GbtConfig, Solver};
use crate::error::GbtError;
use crate::problem::Problem;
use crate::root_law::{RootLaw, UniformGbt};
use crate::uncertainty::uncertainties;
use crate::{coordinate_descent, lbfgs};

/// Scores learned for one (user, criterion)
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedScores {
    /// Scores of kept entities, sorted by entity name
    pub scores: Vec<(String, Score)>,
    /// Entities dropped because both uncertainties saturated
    pub dropped: Vec<String>,
}

/// Learns each user's direct scores from their comparisons
///
/// Users and criteria are learned in parallel on the current rayon pool.
/// Results are merged in (username, criterion) order.
#[derive(Debug, Clone)]
pub struct PreferenceLearner<L: RootLaw = UniformGbt> {
    config: GbtConfig,
    law: L,
    seed: u64,
    cancel: Option<CancelToken>,
}

impl PreferenceLearner<UniformGbt> {
    /// Create a learner with the uniform root law
    pub fn new(config: GbtConfig) -> Self {
        Self::with_law(config, UniformGbt)
    }
}

impl<L: RootLaw> PreferenceLearner<L> {
    /// Create a learner with a custom root law
    pub fn with_law(config: GbtConfig, law: L) -> Self {
        Self {
            config,
            law,
            seed: 0,
            cancel: None,
        }
    }

    /// Seed for the coordinate order
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Stop between tasks once `token` is cancelled
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &GbtConfig {
        &self.config
    }

    /// Learn one user's scores on one criterion
    ///
    /// An empty comparison list yields no scores.
    pub fn learn_user(
        &self,
        username: &str,
        criterion: &str,
        comparisons: &[(String, String, Comparison)],
    ) -> Result<LearnedScores, GbtError> {
        let mut learned = LearnedScores {
            scores: Vec::new(),
            dropped: Vec::new(),
        };
        if comparisons.is_empty() {
            return Ok(learned);
        }

        let problem = Problem::new(&self.law, self.config.prior_std_dev, comparisons);
        let solved = match self.config.solver {
            Solver::CoordinateDescent => {
                let mut rng = StdRng::seed_from_u64(task_seed(self.seed, &[username, criterion]));
                coordinate_descent::solve(&problem, self.config.convergence_error, self.config.max_iter, &mut rng)
            }
            Solver::Lbfgs => lbfgs::solve(
                &problem,
                self.config.convergence_error,
                self.config.max_iter,
                self.config.lbfgs_history,
            ),
        };
        let theta = solved.map_err(|failure| GbtError::NonConvergence {
            username: username.to_string(),
            criterion: criterion.to_string(),
            iterations: failure.iterations,
        })?;

        let max_uncertainty = self.config.max_uncertainty;
        for (e, name) in problem.entities().iter().enumerate() {
            let (left, right) = uncertainties(
                &problem,
                &theta,
                e,
                self.config.uncertainty_nll_increase,
                max_uncertainty,
                self.config.convergence_error,
            );
            if left >= max_uncertainty && right >= max_uncertainty {
                learned.dropped.push(name.clone());
                continue;
            }
            learned.scores.push((name.clone(), Score::new(theta[e], left, right)));
        }

        if !learned.dropped.is_empty() {
            warn!(
                "Dropped {} entities with saturated uncertainty for '{}' on '{}'",
                learned.dropped.len(),
                username,
                criterion
            );
        }
        debug!(
            "Learned {} scores for '{}' on '{}' ({} dropped)",
            learned.scores.len(),
            username,
            criterion,
            learned.dropped.len()
        );
        Ok(learned)
    }

    fn check_cancelled(&self) -> Result<(), GbtError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(GbtError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl<L: RootLaw> StateFunction for PreferenceLearner<L> {
    type Error = GbtError;

    fn name(&self) -> &'static str {
        "preference_learning"
    }

    fn apply(&self, state: &State) -> Result<State, GbtError> {
        self.config.validate()?;
        let start = Instant::now();

        let tasks: Vec<(String, String)> = state
            .criteria()
            .into_iter()
            .flat_map(|criterion| {
                state
                    .comparisons
                    .evaluators(&criterion)
                    .into_iter()
                    .map(move |username| (username, criterion.clone()))
            })
            .collect();

        let results: Vec<(String, String, LearnedScores)> = tasks
            .par_iter()
            .map(|(username, criterion)| {
                self.check_cancelled()?;
                let comparisons = state.comparisons.for_user_criterion(username, criterion);
                let learned = self.learn_user(username, criterion, &comparisons)?;
                Ok((username.clone(), criterion.clone(), learned))
            })
            .collect::<Result<_, GbtError>>()?;

        let mut user_models = UserModels::new();
        let mut dropped = 0;
        for (username, criterion, learned) in results {
            dropped += learned.dropped.len();
            let model = user_models.entry(&username);
            for (entity_name, score) in learned.scores {
                model.set_direct(&entity_name, &criterion, score);
            }
        }

        info!(
            "Preference learning: {} (user, criterion) tasks, {} entities dropped in {:.2}s",
            tasks.len(),
            dropped,
            start.elapsed().as_secs_f64()
        );

        let mut next = state.clone();
        next.user_models = user_models;
        Ok(next)
    }
}

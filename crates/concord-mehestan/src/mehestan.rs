//! Mehestan scaling step

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use concord_domain::state::SCALING_STATISTICS_KEYNAMES;
use concord_domain::traits::StateFunction;
use concord_domain::{CancelToken, MultiKeyTable, ScalerStats, ScalingKind, State};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::activity::{model_norm, select_scalers, user_activity};
use crate::config::MehestanConfig;
use crate::error::ScalingError;
use crate::scales::{Calibration, Scale, UserScores};

/// Scales and statistics of one criterion
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionScales {
    /// Criterion that was scaled
    pub criterion: String,
    /// Scale of every user with a score on the criterion
    pub scales: BTreeMap<String, Scale>,
    /// Activity, scaler status and model norm of the same users
    pub statistics: BTreeMap<String, ScalerStats>,
}

impl CriterionScales {
    /// Number of selected scalers
    pub fn n_scalers(&self) -> usize {
        self.statistics.values().filter(|s| s.is_scaler).count()
    }
}

/// Lipschitz-resilient collaborative scaling
///
/// For every criterion, a multiplier and a translation are appended to each
/// user's model so that users' scores become comparable. Criteria are
/// scaled in parallel.
///
/// # Examples
///
/// ```
/// use concord_domain::{State, StateFunction};
/// use concord_mehestan::{Mehestan, MehestanConfig};
///
/// let mehestan = Mehestan::new(MehestanConfig::default());
/// let scaled = mehestan.apply(&State::default()).unwrap();
/// assert!(scaled.user_models.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Mehestan {
    config: MehestanConfig,
    seed: u64,
    cancel: Option<CancelToken>,
}

impl Mehestan {
    /// Create a scaling step
    pub fn new(config: MehestanConfig) -> Self {
        Self {
            config,
            seed: 0,
            cancel: None,
        }
    }

    /// Seed for pair sampling
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
    pub fn config(&self) -> &MehestanConfig {
        &self.config
    }

    /// Compute the scales of every user on one criterion
    pub fn scale_criterion(&self, state: &State, criterion: &str) -> Result<CriterionScales, ScalingError> {
        let start = Instant::now();
        let config = &self.config;

        let scores: UserScores = state
            .user_models
            .iter()
            .map(|(username, model)| (username.clone(), model.scaled(criterion)))
            .filter(|(_, scores)| !scores.is_empty())
            .collect();

        let activities: BTreeMap<String, f64> = scores
            .iter()
            .map(|(username, s)| {
                let trust = state.users.trust(username);
                let activity = user_activity(trust, config.privacy_penalty, &state.made_public, username, s);
                (username.clone(), activity)
            })
            .collect();
        let scalers = select_scalers(&activities, config.min_scaler_activity, config.n_scalers_max);

        let statistics = scores
            .iter()
            .map(|(username, s)| {
                let stats = ScalerStats {
                    activity: activities[username],
                    is_scaler: scalers.contains(username),
                    model_norm: model_norm(
                        config.privacy_penalty,
                        &state.made_public,
                        username,
                        s,
                        config.p_norm_for_multiplicative_resilience,
                    ),
                };
                (username.clone(), stats)
            })
            .collect();

        if scalers.is_empty() {
            warn!("No user qualifies as a scaler on '{}'; scales are left at identity", criterion);
            let scales = scores.keys().map(|u| (u.clone(), Scale::identity())).collect();
            return Ok(CriterionScales {
                criterion: criterion.to_string(),
                scales,
                statistics,
            });
        }

        let calibration = Calibration {
            config,
            users: &state.users,
            made_public: &state.made_public,
            criterion,
            seed: self.seed,
            cancel: self.cancel.as_ref(),
        };

        let (scaler_scores, nonscaler_scores) = partition(scores, &scalers);
        let (mut scales, scaled_scalers) = calibration.scale_to_scalers(&scaler_scores, &scaler_scores, true)?;
        let (nonscaler_scales, _) = calibration.scale_to_scalers(&scaled_scalers, &nonscaler_scores, false)?;
        scales.extend(nonscaler_scales);

        info!(
            "Scaled {} users on '{}' against {} scalers in {:.2}s",
            scales.len(),
            criterion,
            scalers.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(CriterionScales {
            criterion: criterion.to_string(),
            scales,
            statistics,
        })
    }

    fn check_cancelled(&self) -> Result<(), ScalingError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ScalingError::Cancelled),
            _ => Ok(()),
        }
    }
}

fn partition(scores: UserScores, scalers: &BTreeSet<String>) -> (UserScores, UserScores) {
    scores.into_iter().partition(|(username, _)| scalers.contains(username))
}

impl StateFunction for Mehestan {
    type Error = ScalingError;

    fn name(&self) -> &'static str {
        "scaling"
    }

    fn apply(&self, state: &State) -> Result<State, ScalingError> {
        self.config.validate()?;
        let start = Instant::now();

        let criteria: Vec<String> = state.user_models.criteria().into_iter().collect();
        let per_criterion: Vec<CriterionScales> = criteria
            .par_iter()
            .map(|criterion| {
                self.check_cancelled()?;
                self.scale_criterion(state, criterion)
            })
            .collect::<Result<_, ScalingError>>()?;

        let mut next = state.clone();
        let mut statistics = MultiKeyTable::new(&SCALING_STATISTICS_KEYNAMES);
        for result in per_criterion {
            for (username, scale) in &result.scales {
                let model = next.user_models.entry(username);
                model.add_scaling(ScalingKind::Multiplier, &result.criterion, scale.multiplier);
                model.add_scaling(ScalingKind::Translation, &result.criterion, scale.translation);
            }
            for (username, stats) in result.statistics {
                statistics.insert(&[username.as_str(), result.criterion.as_str()], stats);
            }
        }
        next.scaling_statistics = statistics;

        info!(
            "Mehestan scaling: {} criteria in {:.2}s",
            criteria.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(next)
    }
}

//! Entitywise global aggregation
//!
//! The global score of an entity is a qr-quantile of the users' scaled
//! scores, weighted by their voting rights on that entity.

use std::time::Instant;

use concord_domain::resilient::{qr_deviation, qr_quantile, qr_standard_deviation, qr_uncertainty};
use concord_domain::traits::StateFunction;
use concord_domain::{CancelToken, Score, ScoringModel, State, WeightedScores};
use rayon::prelude::*;
use tracing::info;

use crate::config::AggregationConfig;
use crate::error::VotingError;

/// Aggregates scaled user scores into the global model
///
/// The global score is `Score(value, uncertainty, deviation)`: the
/// qr-quantile of the users' scores, its qr-uncertainty on the left and the
/// `dev_quantile` qr-deviation on the right.
#[derive(Debug, Clone)]
pub struct EntitywiseQrQuantile {
    config: AggregationConfig,
    cancel: Option<CancelToken>,
}

impl EntitywiseQrQuantile {
    /// Create the aggregation step
    pub fn new(config: AggregationConfig) -> Self {
        Self { config, cancel: None }
    }

    /// Stop between tasks once `token` is cancelled
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Global score of weighted user scores
    pub fn aggregate(&self, data: &WeightedScores) -> Score {
        let c = &self.config;
        let value = qr_quantile(c.lipschitz, c.quantile, data, c.default_value, c.error);
        let uncertainty = if c.quantile == 0.5 {
            qr_deviation(c.lipschitz, data, value, 0.5, c.default_dev, c.error)
        } else {
            qr_uncertainty(c.lipschitz, data, c.default_dev, c.error)
        };
        let deviation = qr_standard_deviation(c.lipschitz, data, c.dev_quantile, c.default_dev, c.error);
        Score::new(value, uncertainty, deviation)
    }

    fn check_cancelled(&self) -> Result<(), VotingError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(VotingError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl StateFunction for EntitywiseQrQuantile {
    type Error = VotingError;

    fn name(&self) -> &'static str {
        "aggregation"
    }

    fn apply(&self, state: &State) -> Result<State, VotingError> {
        self.config.validate()?;
        let start = Instant::now();

        let slices: Vec<(String, String)> = state
            .user_models
            .criteria()
            .into_iter()
            .flat_map(|criterion| {
                state
                    .user_models
                    .scored_entities(&criterion)
                    .into_iter()
                    .map(move |entity_name| (entity_name, criterion.clone()))
            })
            .collect();

        let scores: Vec<Score> = slices
            .par_iter()
            .map(|(entity_name, criterion)| {
                self.check_cancelled()?;
                let mut data = WeightedScores::new();
                for (username, model) in state.user_models.iter() {
                    if let Some(score) = model.evaluate(entity_name, criterion) {
                        let weight = state.voting_rights.get(username, entity_name, criterion);
                        data.push_score(&score, weight);
                    }
                }
                Ok(self.aggregate(&data))
            })
            .collect::<Result<_, VotingError>>()?;

        let mut global_model = ScoringModel::new();
        for ((entity_name, criterion), score) in slices.iter().zip(scores) {
            global_model.set_direct(entity_name, criterion, score);
        }

        info!(
            "Global aggregation: {} (entity, criterion) scores in {:.2}s",
            slices.len(),
            start.elapsed().as_secs_f64()
        );

        let mut next = state.clone();
        next.global_model = global_model;
        Ok(next)
    }
}

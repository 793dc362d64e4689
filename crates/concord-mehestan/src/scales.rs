//! Fitting scalees to scalers
//!
//! For every (scalee, scaler) pair the scaler's scores are compared with the
//! scalee's, first as ratios of score differences (multiplier), then as
//! score differences once the multiplier is applied (translation). Each
//! pair is summarized by a qr-median, and the summaries are aggregated
//! across scalers with the scalers' trust as voting rights.

use std::collections::BTreeMap;

use concord_domain::resilient::{qr_deviation, qr_median};
use concord_domain::seed::task_seed;
use concord_domain::{CancelToken, MadePublic, Score, Users, WeightedScores};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::activity::model_norm;
use crate::config::MehestanConfig;
use crate::error::ScalingError;
use crate::pairs::entity_pairs;

/// `username → entity_name → score` on one criterion
pub type UserScores = BTreeMap<String, BTreeMap<String, Score>>;

/// Multiplier and translation of one user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    /// Multiplicative correction
    pub multiplier: Score,
    /// Additive correction, applied after the multiplier
    pub translation: Score,
}

impl Scale {
    /// The scale that leaves scores unchanged
    pub fn identity() -> Self {
        Self {
            multiplier: Score::exact(1.0),
            translation: Score::exact(0.0),
        }
    }
}

/// Everything needed to scale users on one criterion
pub struct Calibration<'a> {
    /// Scaling parameters
    pub config: &'a MehestanConfig,
    /// Trust source
    pub users: &'a Users,
    /// Privacy of each rating
    pub made_public: &'a MadePublic,
    /// Criterion being scaled
    pub criterion: &'a str,
    /// Run seed for pair sampling
    pub seed: u64,
    /// Checked before each scalee
    pub cancel: Option<&'a CancelToken>,
}

impl Calibration<'_> {
    /// Scale every scalee against the scalers
    ///
    /// Returns the scale of each scalee and the scalees' scores after
    /// scaling. When `scalees_are_scalers`, translations are computed
    /// against the already multiplied scalers.
    pub fn scale_to_scalers(
        &self,
        scalers: &UserScores,
        scalees: &UserScores,
        scalees_are_scalers: bool,
    ) -> Result<(BTreeMap<String, Scale>, UserScores), ScalingError> {
        let multipliers: BTreeMap<String, Score> = scalees
            .par_iter()
            .map(|(scalee, scores)| {
                self.check_cancelled()?;
                Ok((scalee.clone(), self.multiplier(scalee, scores, scalers)))
            })
            .collect::<Result<_, ScalingError>>()?;

        let multiplied: UserScores = scalees
            .iter()
            .map(|(scalee, scores)| {
                let multiplier = multipliers[scalee];
                let scaled = scores.iter().map(|(e, s)| (e.clone(), *s * multiplier)).collect();
                (scalee.clone(), scaled)
            })
            .collect();
        let references = if scalees_are_scalers { &multiplied } else { scalers };

        let translations: BTreeMap<String, Score> = multiplied
            .par_iter()
            .map(|(scalee, scores)| {
                self.check_cancelled()?;
                Ok((scalee.clone(), self.translation(scalee, scores, references)))
            })
            .collect::<Result<_, ScalingError>>()?;

        let mut scales = BTreeMap::new();
        let mut scaled = UserScores::new();
        for (scalee, scores) in multiplied {
            let scale = Scale {
                multiplier: multipliers[&scalee],
                translation: translations[&scalee],
            };
            let translated = scores.into_iter().map(|(e, s)| (e, s + scale.translation)).collect();
            debug!(
                "Scaled '{}' on '{}': multiplier {}, translation {}",
                scalee, self.criterion, scale.multiplier, scale.translation
            );
            scales.insert(scalee.clone(), scale);
            scaled.insert(scalee, translated);
        }
        Ok((scales, scaled))
    }

    fn check_cancelled(&self) -> Result<(), ScalingError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(ScalingError::Cancelled),
            _ => Ok(()),
        }
    }

    fn penalty(&self, username: &str, entity_name: &str) -> f64 {
        self.made_public
            .penalty(self.config.privacy_penalty, username, entity_name)
    }

    /// Multiplier of `scalee` against every scaler
    fn multiplier(&self, scalee: &str, scores: &BTreeMap<String, Score>, scalers: &UserScores) -> Score {
        let config = self.config;
        let mut per_scaler = WeightedScores::new();
        for (scaler, reference) in scalers {
            let ratios = if scaler == scalee {
                WeightedScores::from_values(&[1.0], &[1.0])
            } else {
                self.ratios(scalee, scores, scaler, reference)
            };
            if ratios.is_empty() {
                continue;
            }
            let summary = summarize(config.user_comparison_lipschitz, &ratios, 1.0, config.default_multiplier_dev, config.error);
            per_scaler.push_score(&summary, self.users.trust(scaler));
        }

        let norm = model_norm(
            config.privacy_penalty,
            self.made_public,
            scalee,
            scores,
            config.p_norm_for_multiplicative_resilience,
        );
        let lipschitz = config.lipschitz / (8.0 * (1e-9 + norm));
        summarize(lipschitz, &per_scaler, 1.0, config.default_multiplier_dev, config.error)
    }

    /// `|Δθ_scaler / Δθ_scalee|` over pairs of common entities
    fn ratios(
        &self,
        scalee: &str,
        scores: &BTreeMap<String, Score>,
        scaler: &str,
        reference: &BTreeMap<String, Score>,
    ) -> WeightedScores {
        let common: Vec<&String> = scores.keys().filter(|e| reference.contains_key(*e)).collect();
        let mut rng = StdRng::seed_from_u64(task_seed(self.seed, &[self.criterion, scalee, scaler]));
        let pairs = entity_pairs(
            common.len(),
            self.config.n_entity_to_fully_compare_max,
            self.config.n_diffs_sample_max,
            &mut rng,
        );

        let mut ratios = WeightedScores::new();
        for (i, j) in pairs {
            let (e, f) = (common[i], common[j]);
            let ratio = (reference[e] - reference[f]) / (scores[e] - scores[f]);
            if ratio.is_nan() {
                continue;
            }
            ratios.push_score(&ratio.abs(), self.penalty(scaler, e) * self.penalty(scaler, f));
        }
        ratios
    }

    /// Translation of the multiplied `scalee` against every scaler
    fn translation(&self, scalee: &str, scores: &BTreeMap<String, Score>, scalers: &UserScores) -> Score {
        let config = self.config;
        let mut per_scaler = WeightedScores::new();
        for (scaler, reference) in scalers {
            let mut diffs = WeightedScores::new();
            if scaler == scalee {
                diffs.push(0.0, 1.0, 0.0, 0.0);
            } else {
                for (entity_name, score) in scores {
                    if let Some(other) = reference.get(entity_name) {
                        diffs.push_score(&(*other - *score), self.penalty(scaler, entity_name));
                    }
                }
            }
            if diffs.is_empty() {
                continue;
            }
            let summary = summarize(config.user_comparison_lipschitz, &diffs, 0.0, config.default_translation_dev, config.error);
            per_scaler.push_score(&summary, self.users.trust(scaler));
        }
        summarize(config.lipschitz / 8.0, &per_scaler, 0.0, config.default_translation_dev, config.error)
    }
}

/// qr-median with its qr-uncertainty as a symmetric score
fn summarize(lipschitz: f64, data: &WeightedScores, default: f64, default_dev: f64, error: f64) -> Score {
    let value = qr_median(lipschitz, data, default, error);
    let uncertainty = qr_deviation(lipschitz, data, value, 0.5, default_dev, error);
    Score::symmetric(value, uncertainty)
}

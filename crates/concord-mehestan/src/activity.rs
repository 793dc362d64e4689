//! Scaler selection
//!
//! Active, trusted users are the ones whose models are compared with each
//! other first. Everyone else is fitted to them afterwards.

use std::collections::{BTreeMap, BTreeSet};

use concord_domain::{MadePublic, Score};

/// Trustworthy activeness of a user on one criterion
///
/// `trust × Σ penalty(e)` over entities with a finite score, where the
/// penalty is 1 for public ratings and `privacy_penalty` otherwise.
pub fn user_activity(
    trust: f64,
    privacy_penalty: f64,
    made_public: &MadePublic,
    username: &str,
    scores: &BTreeMap<String, Score>,
) -> f64 {
    if trust <= 0.0 {
        return 0.0;
    }
    let penalized: f64 = scores
        .iter()
        .filter(|(_, score)| score.is_finite())
        .map(|(entity_name, _)| made_public.penalty(privacy_penalty, username, entity_name))
        .sum();
    trust * penalized
}

/// The `n_max` most active users whose activity reaches `min_activity`
///
/// Ties are broken by username.
pub fn select_scalers(activities: &BTreeMap<String, f64>, min_activity: f64, n_max: usize) -> BTreeSet<String> {
    let mut ranked: Vec<(&String, f64)> = activities.iter().map(|(u, a)| (u, *a)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n_max)
        .take_while(|(_, activity)| *activity >= min_activity)
        .map(|(username, _)| username.clone())
        .collect()
}

/// Penalty-weighted `p`-norm of a user's scores
///
/// `(Σ w_e |θ_e|^p / Σ w_e)^(1/p)` over finite scores, or 1 when there are
/// none.
pub fn model_norm(
    privacy_penalty: f64,
    made_public: &MadePublic,
    username: &str,
    scores: &BTreeMap<String, Score>,
    p: f64,
) -> f64 {
    let (mut weight_sum, mut weighted_sum) = (0.0, 0.0);
    for (entity_name, score) in scores.iter().filter(|(_, score)| score.is_finite()) {
        let weight = made_public.penalty(privacy_penalty, username, entity_name);
        weight_sum += weight;
        weighted_sum += weight * score.value.abs().powf(p);
    }
    if weight_sum <= 0.0 {
        return 1.0;
    }
    (weighted_sum / weight_sum).powf(1.0 / p)
}

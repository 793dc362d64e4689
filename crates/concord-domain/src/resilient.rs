//! Lipschitz-resilient aggregation primitives
//!
//! Every estimator here minimizes a quadratically regularized robust loss, so
//! the influence of any single input on the output is bounded by its weight
//! times the resilience parameter `lipschitz` (W).
//!
//! Inputs are [`WeightedScores`]: values with weights and asymmetric
//! uncertainties. Entries with a non-finite value or a non-positive weight
//! are ignored.

use crate::score::Score;
use crate::solver::{brentq, brentq_extending, SolveError, DEFAULT_MAX_ITER};

/// Values with weights and left/right uncertainties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedScores {
    /// Observed values
    pub values: Vec<f64>,
    /// Voting rights of each value
    pub weights: Vec<f64>,
    /// Left uncertainty of each value
    pub left_uncs: Vec<f64>,
    /// Right uncertainty of each value
    pub right_uncs: Vec<f64>,
}

impl WeightedScores {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Values with the given weights and no uncertainty
    ///
    /// # Panics
    /// Panics if lengths differ
    pub fn from_values(values: &[f64], weights: &[f64]) -> Self {
        assert_eq!(values.len(), weights.len(), "values and weights must align");
        Self {
            values: values.to_vec(),
            weights: weights.to_vec(),
            left_uncs: vec![0.0; values.len()],
            right_uncs: vec![0.0; values.len()],
        }
    }

    /// Add one observation
    pub fn push(&mut self, value: f64, weight: f64, left_unc: f64, right_unc: f64) {
        self.values.push(value);
        self.weights.push(weight);
        self.left_uncs.push(left_unc);
        self.right_uncs.push(right_unc);
    }

    /// Add one score with its weight
    pub fn push_score(&mut self, score: &Score, weight: f64) {
        self.push(score.value, weight, score.left_unc, score.right_unc);
    }

    /// Number of observations, valid or not
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there is no observation
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of the weights of valid observations
    pub fn total_weight(&self) -> f64 {
        self.valid().map(|(_, w, _, _)| w).sum()
    }

    /// `(value, weight, left_unc, right_unc)` of observations that take part
    fn valid(&self) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        (0..self.values.len())
            .map(move |i| (self.values[i], self.weights[i], self.left_uncs[i], self.right_uncs[i]))
            .filter(|&(x, w, _, _)| x.is_finite() && w.is_finite() && w > 0.0)
    }
}

/// Quadratically regularized quantile
///
/// Root of `(m - default)/W + Σ w_i ρ_q((m - x_i) / sqrt(δ_i² + (m - x_i)²))`
/// where `δ_i` is the left uncertainty when `m < x_i` and the right one
/// otherwise, and `ρ_q` scales negative terms by `min(1, q/(1-q))` and
/// positive ones by `min(1, (1-q)/q)`. An infinite `lipschitz` drops the
/// regularization.
///
/// Returns `default` when no observation has positive weight.
///
/// # Panics
/// Panics if `quantile` is not in (0, 1) or `lipschitz` is not positive
pub fn qr_quantile(
    lipschitz: f64,
    quantile: f64,
    data: &WeightedScores,
    default: f64,
    error: f64,
) -> f64 {
    assert!(quantile > 0.0 && quantile < 1.0, "quantile must be in (0, 1), got {}", quantile);
    assert!(lipschitz > 0.0, "lipschitz must be positive, got {}", lipschitz);

    let observations: Vec<(f64, f64, f64, f64)> = data.valid().collect();
    if observations.is_empty() {
        return default;
    }

    let below_scale = (quantile / (1.0 - quantile)).min(1.0);
    let above_scale = ((1.0 - quantile) / quantile).min(1.0);
    let derivative = |m: f64| {
        let regularization = if lipschitz.is_finite() {
            (m - default) / lipschitz
        } else {
            0.0
        };
        let forces: f64 = observations
            .iter()
            .map(|&(x, w, left, right)| {
                let delta = m - x;
                if delta == 0.0 {
                    return 0.0;
                }
                let unc = if delta < 0.0 { left } else { right };
                let force = delta / (unc * unc + delta * delta).sqrt();
                if force < 0.0 {
                    w * below_scale * force
                } else {
                    w * above_scale * force
                }
            })
            .sum();
        regularization + forces
    };

    let result = if lipschitz.is_finite() {
        let total: f64 = observations.iter().map(|&(_, w, _, _)| w).sum();
        let radius = lipschitz * (total + 1.0);
        brentq(derivative, default - radius, default + radius, error, DEFAULT_MAX_ITER)
    } else {
        let lo = observations.iter().map(|o| o.0).fold(f64::INFINITY, f64::min) - 1.0;
        let hi = observations.iter().map(|o| o.0).fold(f64::NEG_INFINITY, f64::max) + 1.0;
        brentq_extending(derivative, lo, hi, error, DEFAULT_MAX_ITER)
    };

    match result {
        Ok(m) => m,
        Err(SolveError::MaxIterations { best, .. }) => best,
        Err(SolveError::NoSignChange { .. }) => default,
    }
}

/// Quadratically regularized median, [`qr_quantile`] at 0.5
pub fn qr_median(lipschitz: f64, data: &WeightedScores, default: f64, error: f64) -> f64 {
    qr_quantile(lipschitz, 0.5, data, default, error)
}

/// Quantile of deviations from a given center
///
/// Each deviation `|x_i - center|` keeps the uncertainty pointing away from
/// the center and caps the one pointing towards it at the deviation itself.
/// The result is clipped to be non-negative.
pub fn qr_deviation(
    lipschitz: f64,
    data: &WeightedScores,
    center: f64,
    quantile_dev: f64,
    default_dev: f64,
    error: f64,
) -> f64 {
    let mut deviations = WeightedScores::new();
    for i in 0..data.len() {
        let (x, w) = (data.values[i], data.weights[i]);
        let (left, right) = (data.left_uncs[i], data.right_uncs[i]);
        let deviation = (x - center).abs();
        let (dev_left, dev_right) = if x > center {
            (left.min(deviation), right)
        } else if x < center {
            (right.min(deviation), left)
        } else {
            (0.0, 0.0)
        };
        deviations.push(deviation, w, dev_left, dev_right);
    }
    qr_quantile(lipschitz, quantile_dev, &deviations, default_dev, error).max(0.0)
}

/// Lipschitz-resilient standard deviation
///
/// Quantile `quantile_dev` of deviations from the qr-median (default 0).
pub fn qr_standard_deviation(
    lipschitz: f64,
    data: &WeightedScores,
    quantile_dev: f64,
    default_dev: f64,
    error: f64,
) -> f64 {
    let median = qr_median(lipschitz, data, 0.0, error);
    qr_deviation(lipschitz, data, median, quantile_dev, default_dev, error)
}

/// Lipschitz-resilient uncertainty, [`qr_standard_deviation`] at 0.5
pub fn qr_uncertainty(lipschitz: f64, data: &WeightedScores, default_dev: f64, error: f64) -> f64 {
    qr_standard_deviation(lipschitz, data, 0.5, default_dev, error)
}

/// Weighted mean of values clipped to `[center - radius, center + radius]`
///
/// Returns `center` when the total weight is zero.
pub fn clip_mean(data: &WeightedScores, center: f64, radius: f64) -> f64 {
    let (mut weighted, mut total) = (0.0, 0.0);
    for (x, w, _, _) in data.valid() {
        weighted += w * x.clamp(center - radius, center + radius);
        total += w;
    }
    if total > 0.0 {
        weighted / total
    } else {
        center
    }
}

/// Byzantine-robustified mean with default 0
pub fn br_mean(lipschitz: f64, data: &WeightedScores, error: f64) -> f64 {
    lipschitz_resilient_mean(lipschitz, data, 0.0, error)
}

/// Lipschitz-resilient mean
///
/// Mean clipped around `qr_median(W/4)` with radius `Σw · W/4`. Large
/// participation makes the clip inactive and recovers the weighted mean.
/// Returns `default` when the total weight is zero.
pub fn lipschitz_resilient_mean(lipschitz: f64, data: &WeightedScores, default: f64, error: f64) -> f64 {
    let total = data.total_weight();
    if total <= 0.0 {
        return default;
    }
    let center = qr_median(lipschitz / 4.0, data, default, error);
    clip_mean(data, center, total * lipschitz / 4.0)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const ERROR: f64 = 1e-9;

    fn arb_data() -> impl Strategy<Value = Vec<(f64, f64, f64, f64)>> {
        prop::collection::vec((-10.0..10.0f64, 0.0..2.0f64, 0.0..1.0f64, 0.0..1.0f64), 1..12)
    }

    fn build(rows: &[(f64, f64, f64, f64)]) -> WeightedScores {
        let mut data = WeightedScores::new();
        for &(x, w, l, r) in rows {
            data.push(x, w, l, r);
        }
        data
    }

    proptest! {
        /// Property: moving one input moves the qr-median by at most 2·w_i·W
        #[test]
        fn test_qr_median_resilience(
            rows in arb_data(),
            replacement in -1000.0..1000.0f64,
            lipschitz in 0.01..5.0f64,
        ) {
            let before = qr_median(lipschitz, &build(&rows), 0.0, ERROR);
            let mut changed = rows.clone();
            changed[0].0 = replacement;
            let after = qr_median(lipschitz, &build(&changed), 0.0, ERROR);
            prop_assert!((after - before).abs() <= 2.0 * rows[0].1 * lipschitz + 1e-6);
        }

        /// Property: moving one input moves any qr-quantile by at most w_i·W times
        /// the spread of its force scales, which is at most 2
        #[test]
        fn test_qr_quantile_resilience(
            rows in arb_data(),
            replacement in -1000.0..1000.0f64,
            lipschitz in 0.01..5.0f64,
            q in 0.01..0.99f64,
            default in -5.0..5.0f64,
        ) {
            let before = qr_quantile(lipschitz, q, &build(&rows), default, ERROR);
            let mut changed = rows.clone();
            changed[0].0 = replacement;
            let after = qr_quantile(lipschitz, q, &build(&changed), default, ERROR);

            let below = (q / (1.0 - q)).min(1.0);
            let above = ((1.0 - q) / q).min(1.0);
            prop_assert!((after - before).abs() <= rows[0].1 * lipschitz * (below + above) + 1e-6);
        }

        /// Property: a zero-weight voter has no influence on any qr-quantile
        #[test]
        fn test_qr_quantile_ignores_zero_weight(
            rows in arb_data(),
            replacement in -1000.0..1000.0f64,
            q in 0.01..0.99f64,
        ) {
            let mut rows = rows;
            rows[0].1 = 0.0;
            let before = qr_quantile(0.5, q, &build(&rows), 0.0, ERROR);
            rows[0].0 = replacement;
            let after = qr_quantile(0.5, q, &build(&rows), 0.0, ERROR);
            prop_assert!((after - before).abs() <= 1e-6);
        }

        /// Property: moving one input moves the resilient mean by at most w_i·W
        #[test]
        fn test_resilient_mean_resilience(
            rows in arb_data(),
            replacement in -1000.0..1000.0f64,
            lipschitz in 0.01..5.0f64,
        ) {
            let before = lipschitz_resilient_mean(lipschitz, &build(&rows), 0.0, ERROR);
            let mut changed = rows.clone();
            changed[0].0 = replacement;
            let after = lipschitz_resilient_mean(lipschitz, &build(&changed), 0.0, ERROR);
            prop_assert!((after - before).abs() <= rows[0].1 * lipschitz + 1e-6);
        }

        /// Property: the qr-quantile stays within W·(Σw + 1) of the default
        #[test]
        fn test_quantile_bounded(rows in arb_data(), q in 0.05..0.95f64, default in -5.0..5.0f64) {
            let data = build(&rows);
            let m = qr_quantile(1.0, q, &data, default, ERROR);
            prop_assert!((m - default).abs() <= data.total_weight() + 1.0 + 1e-9);
        }

        /// Property: deviations are never negative
        #[test]
        fn test_deviation_non_negative(rows in arb_data(), q in 0.05..0.95f64) {
            prop_assert!(qr_standard_deviation(1.0, &build(&rows), q, 0.0, ERROR) >= 0.0);
        }
    }
}

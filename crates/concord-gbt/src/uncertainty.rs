//! Asymmetric uncertainties around the MAP
//!
//! The right (left) uncertainty of an entity is how far its score can move
//! up (down), all other scores fixed, before the negative log-likelihood
//! grows by `nll_increase`. The prior does not take part.

use concord_domain::solver::brentq;

use crate::problem::Problem;
use crate::root_law::RootLaw;

/// `(left_unc, right_unc)` of entity `e` at the MAP `theta`
///
/// A side without a root below `max_uncertainty` is set to `max_uncertainty`.
pub fn uncertainties<L: RootLaw>(
    problem: &Problem<'_, L>,
    theta: &[f64],
    e: usize,
    nll_increase: f64,
    max_uncertainty: f64,
    tolerance: f64,
) -> (f64, f64) {
    let base = problem.local_likelihood(theta, e, 0.0);
    let excess = |delta: f64| problem.local_likelihood(theta, e, delta) - base - nll_increase;

    let right = brentq(excess, 0.0, max_uncertainty, tolerance, 200)
        .map(|delta| delta.clamp(0.0, max_uncertainty))
        .unwrap_or(max_uncertainty);
    let left = brentq(excess, -max_uncertainty, 0.0, tolerance, 200)
        .map(|delta| (-delta).clamp(0.0, max_uncertainty))
        .unwrap_or(max_uncertainty);

    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root_law::UniformGbt;
    use concord_domain::Comparison;

    fn triple(l: &str, r: &str, value: f64) -> (String, String, Comparison) {
        (l.to_string(), r.to_string(), Comparison::new(value, 10.0).unwrap())
    }

    #[test]
    fn test_tie_is_symmetric() {
        let law = UniformGbt;
        let problem = Problem::new(&law, 7.0, &[triple("a", "b", 0.0)]);
        let (left, right) = uncertainties(&problem, &[0.0, 0.0], 0, 1.0, 1e3, 1e-10);
        assert!(left.is_finite() && left < 1e3);
        assert!((left - right).abs() < 1e-8);
    }

    #[test]
    fn test_extreme_comparison_saturates_one_side() {
        let law = UniformGbt;
        // a strongly preferred: nothing bounds a from above
        let problem = Problem::new(&law, 7.0, &[triple("a", "b", -10.0)]);
        let (left, right) = uncertainties(&problem, &[5.0, -5.0], 0, 1.0, 1e3, 1e-10);
        assert_eq!(right, 1e3);
        assert!(left < 1e3);
    }

    #[test]
    fn test_uncertainty_reaches_the_nll_increase() {
        let law = UniformGbt;
        let problem = Problem::new(&law, 7.0, &[triple("a", "b", -4.0), triple("a", "b", 3.0)]);
        let theta = [0.1, -0.1];
        let (left, right) = uncertainties(&problem, &theta, 0, 1.0, 1e3, 1e-12);
        let base = problem.local_likelihood(&theta, 0, 0.0);
        assert!((problem.local_likelihood(&theta, 0, right) - base - 1.0).abs() < 1e-8);
        assert!((problem.local_likelihood(&theta, 0, -left) - base - 1.0).abs() < 1e-8);
    }
}

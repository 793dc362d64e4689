//! Coordinate descent MAP solver
//!
//! Each coordinate update solves the one-dimensional stationarity equation
//! exactly with Brent's method. The objective is strictly convex, so the
//! derivative along a coordinate is increasing and has a unique root.

use concord_domain::solver::brentq;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::problem::Problem;
use crate::root_law::RootLaw;

/// Result of a solver run that did not converge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotConverged {
    /// Iterations performed
    pub iterations: usize,
}

/// Minimize the objective one coordinate at a time, in random order
///
/// Stops after the first full pass in which every coordinate moved by less
/// than `tolerance`. Fails after `max_passes` passes.
pub fn solve<L: RootLaw, R: Rng>(
    problem: &Problem<'_, L>,
    tolerance: f64,
    max_passes: usize,
    rng: &mut R,
) -> Result<Vec<f64>, NotConverged> {
    let n = problem.dimension();
    let mut theta = vec![0.0; n];
    let mut order: Vec<usize> = (0..n).collect();

    for _ in 0..max_passes {
        order.shuffle(rng);
        let mut largest_move: f64 = 0.0;
        for &e in &order {
            let updated = solve_coordinate(problem, &theta, e, tolerance);
            largest_move = largest_move.max((updated - theta[e]).abs());
            theta[e] = updated;
        }
        if largest_move < tolerance {
            return Ok(theta);
        }
    }

    Err(NotConverged {
        iterations: max_passes,
    })
}

/// Root of the coordinate derivative of `e`, other scores held fixed
fn solve_coordinate<L: RootLaw>(problem: &Problem<'_, L>, theta: &[f64], e: usize, tolerance: f64) -> f64 {
    // |ψ'| < 1 and |r| <= 1, so the root lies within (2·degree + 1)·σ²
    let bound = (2.0 * problem.degree(e) as f64 + 1.0) * problem.prior_variance();
    let derivative = |x: f64| problem.coordinate_derivative(theta, e, x);
    match brentq(derivative, -bound, bound, tolerance / 10.0, 200) {
        Ok(x) => x,
        Err(err) => {
            warn!("Coordinate {} kept at {}: {}", e, theta[e], err);
            theta[e]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root_law::UniformGbt;
    use concord_domain::Comparison;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn triple(l: &str, r: &str, value: f64) -> (String, String, Comparison) {
        (l.to_string(), r.to_string(), Comparison::new(value, 10.0).unwrap())
    }

    #[test]
    fn test_single_comparison_orders_scores() {
        let law = UniformGbt;
        let problem = Problem::new(&law, 7.0, &[triple("a", "b", -10.0)]);
        let mut rng = StdRng::seed_from_u64(0);
        let theta = solve(&problem, 1e-8, 100, &mut rng).unwrap();
        assert!(theta[0] > theta[1]);
        // the prior keeps the solution centred
        assert!((theta[0] + theta[1]).abs() < 1e-6);
    }

    #[test]
    fn test_stationary_point() {
        let law = UniformGbt;
        let problem = Problem::new(
            &law,
            7.0,
            &[triple("a", "b", -3.0), triple("b", "c", -6.0), triple("c", "d", 2.0)],
        );
        let mut rng = StdRng::seed_from_u64(42);
        let theta = solve(&problem, 1e-9, 1000, &mut rng).unwrap();
        let mut grad = vec![0.0; 4];
        problem.gradient(&theta, &mut grad);
        assert!(grad.iter().all(|g| g.abs() < 1e-6), "gradient {:?}", grad);
    }

    #[test]
    fn test_unsolvable_coordinate_keeps_its_value() {
        let law = UniformGbt;
        let problem = Problem::new(&law, 7.0, &[triple("a", "b", -3.0)]);
        // a NaN neighbour makes the derivative NaN on the whole bracket
        assert_eq!(solve_coordinate(&problem, &[f64::NAN, 0.25], 1, 1e-8), 0.25);
    }

    #[test]
    fn test_pass_budget_exhausted() {
        let law = UniformGbt;
        let problem = Problem::new(&law, 7.0, &[triple("a", "b", -3.0), triple("b", "c", -6.0)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(solve(&problem, 1e-12, 1, &mut rng), Err(NotConverged { iterations: 1 }));
    }
}

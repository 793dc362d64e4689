//! L-BFGS MAP solver
//!
//! Two-loop recursion over the last `history` correction pairs, with a
//! backtracking line search enforcing the Armijo condition.

use std::collections::VecDeque;

use crate::coordinate_descent::NotConverged;
use crate::problem::Problem;
use crate::root_law::RootLaw;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;

/// Minimize the objective with L-BFGS from the origin
///
/// Converged when the max-norm of the gradient, or of the last step, is
/// below `tolerance`.
pub fn solve<L: RootLaw>(
    problem: &Problem<'_, L>,
    tolerance: f64,
    max_iter: usize,
    history: usize,
) -> Result<Vec<f64>, NotConverged> {
    let n = problem.dimension();
    let mut x = vec![0.0; n];
    let mut grad = vec![0.0; n];
    problem.gradient(&x, &mut grad);
    let mut value = problem.objective(&x);
    let mut pairs: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(history);

    for _ in 0..max_iter {
        if max_norm(&grad) < tolerance {
            return Ok(x);
        }

        let mut direction = two_loop(&grad, &pairs);
        let mut slope = dot(&grad, &direction);
        if slope >= 0.0 {
            pairs.clear();
            direction = grad.iter().map(|g| -g).collect();
            slope = -dot(&grad, &grad);
        }

        let mut step = 1.0;
        let mut candidate = axpy(&x, step, &direction);
        let mut candidate_value = problem.objective(&candidate);
        for _ in 0..MAX_BACKTRACKS {
            if candidate_value <= value + ARMIJO * step * slope {
                break;
            }
            step /= 2.0;
            candidate = axpy(&x, step, &direction);
            candidate_value = problem.objective(&candidate);
        }

        let mut candidate_grad = vec![0.0; n];
        problem.gradient(&candidate, &mut candidate_grad);

        let s: Vec<f64> = candidate.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = candidate_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > 1e-12 {
            if pairs.len() == history {
                pairs.pop_front();
            }
            pairs.push_back((s.clone(), y, 1.0 / sy));
        }

        x = candidate;
        grad = candidate_grad;
        value = candidate_value;

        if max_norm(&s) < tolerance {
            return Ok(x);
        }
    }

    if max_norm(&grad) < tolerance {
        return Ok(x);
    }
    Err(NotConverged { iterations: max_iter })
}

/// Approximate `-H⁻¹ g` from stored `(s, y, 1/sᵀy)` pairs
fn two_loop(grad: &[f64], pairs: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
    let mut q = grad.to_vec();
    let mut alphas = Vec::with_capacity(pairs.len());
    for (s, y, rho) in pairs.iter().rev() {
        let alpha = rho * dot(s, &q);
        for (qi, yi) in q.iter_mut().zip(y) {
            *qi -= alpha * yi;
        }
        alphas.push(alpha);
    }

    let gamma = match pairs.back() {
        Some((s, y, _)) => dot(s, y) / dot(y, y),
        None => 1.0,
    };
    for qi in q.iter_mut() {
        *qi *= gamma;
    }

    for ((s, y, rho), alpha) in pairs.iter().zip(alphas.into_iter().rev()) {
        let beta = rho * dot(y, &q);
        for (qi, si) in q.iter_mut().zip(s) {
            *qi += (alpha - beta) * si;
        }
    }

    q.iter().map(|v| -v).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn axpy(x: &[f64], step: f64, direction: &[f64]) -> Vec<f64> {
    x.iter().zip(direction).map(|(xi, di)| xi + step * di).collect()
}

fn max_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

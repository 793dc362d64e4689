//! MAP objective of one (user, criterion)

use std::collections::BTreeSet;

use concord_domain::Comparison;

use crate::root_law::RootLaw;

/// One comparison between entity indices, with normalized value `r`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedComparison {
    /// Index of the left entity
    pub left: usize,
    /// Index of the right entity
    pub right: usize,
    /// Normalized comparison, positive when left is preferred
    pub r: f64,
}

/// Negative log-posterior of a user's scores on one criterion
///
/// `Σ_c [ψ(θ_l - θ_r) - r_c (θ_l - θ_r)] + Σ_e θ_e² / (2σ²)`
#[derive(Debug, Clone)]
pub struct Problem<'a, L: RootLaw> {
    law: &'a L,
    prior_variance: f64,
    entities: Vec<String>,
    comparisons: Vec<IndexedComparison>,
    /// For each entity, `(other entity, r oriented towards this entity)`
    neighbours: Vec<Vec<(usize, f64)>>,
}

impl<'a, L: RootLaw> Problem<'a, L> {
    /// Build the objective from `(left, right, comparison)` triples
    pub fn new(law: &'a L, prior_std_dev: f64, comparisons: &[(String, String, Comparison)]) -> Self {
        let entities: Vec<String> = comparisons
            .iter()
            .flat_map(|(l, r, _)| [l.clone(), r.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = |name: &str| entities.binary_search_by(|e| e.as_str().cmp(name)).unwrap_or(0);

        let mut indexed = Vec::with_capacity(comparisons.len());
        let mut neighbours = vec![Vec::new(); entities.len()];
        for (left, right, comparison) in comparisons {
            let (l, r) = (index(left), index(right));
            let value = comparison.normalized();
            indexed.push(IndexedComparison { left: l, right: r, r: value });
            neighbours[l].push((r, value));
            neighbours[r].push((l, -value));
        }

        Self {
            law,
            prior_variance: prior_std_dev * prior_std_dev,
            entities,
            comparisons: indexed,
            neighbours,
        }
    }

    /// Compared entities, sorted; scores are indexed in this order
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Number of scores to learn
    pub fn dimension(&self) -> usize {
        self.entities.len()
    }

    /// Number of comparisons involving entity `e`
    pub fn degree(&self, e: usize) -> usize {
        self.neighbours[e].len()
    }

    /// Prior variance σ²
    pub fn prior_variance(&self) -> f64 {
        self.prior_variance
    }

    /// Full negative log-posterior
    pub fn objective(&self, theta: &[f64]) -> f64 {
        let likelihood: f64 = self
            .comparisons
            .iter()
            .map(|c| self.law.loss(theta[c.left] - theta[c.right], c.r))
            .sum();
        let prior: f64 = theta.iter().map(|t| t * t).sum::<f64>() / (2.0 * self.prior_variance);
        likelihood + prior
    }

    /// Gradient of the negative log-posterior, written into `grad`
    pub fn gradient(&self, theta: &[f64], grad: &mut [f64]) {
        for (g, t) in grad.iter_mut().zip(theta) {
            *g = t / self.prior_variance;
        }
        for c in &self.comparisons {
            let d = theta[c.left] - theta[c.right];
            let slope = self.law.cumulant_derivative(d) - c.r;
            grad[c.left] += slope;
            grad[c.right] -= slope;
        }
    }

    /// Derivative of the objective along coordinate `e`, evaluated at `θ_e = x`
    pub fn coordinate_derivative(&self, theta: &[f64], e: usize, x: f64) -> f64 {
        let forces: f64 = self.neighbours[e]
            .iter()
            .map(|&(f, r)| self.law.cumulant_derivative(x - theta[f]) - r)
            .sum();
        x / self.prior_variance + forces
    }

    /// Likelihood terms involving `e`, with `θ_e` shifted by `delta`
    ///
    /// The prior is excluded.
    pub fn local_likelihood(&self, theta: &[f64], e: usize, delta: f64) -> f64 {
        let x = theta[e] + delta;
        self.neighbours[e]
            .iter()
            .map(|&(f, r)| self.law.loss(x - theta[f], r))
            .sum()
    }
}

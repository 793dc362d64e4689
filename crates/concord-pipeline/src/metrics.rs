//! Metrics collected during a pipeline run

use std::collections::{BTreeMap, BTreeSet};

use concord_domain::State;
use serde::Serialize;

/// Duration of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTiming {
    /// Step name
    pub name: String,
    /// Wall-clock duration in seconds
    pub seconds: f64,
}

/// Metrics of a pipeline run
///
/// Tracks input sizes, per-step durations, scalers per criterion and the
/// entities dropped for saturated uncertainty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Number of users in the input
    pub n_users: usize,

    /// Number of known entities
    pub n_entities: usize,

    /// Number of criteria with comparisons
    pub n_criteria: usize,

    /// Number of stored comparisons
    pub n_comparisons: usize,

    /// Steps in execution order
    pub steps: Vec<StepTiming>,

    /// Selected scalers per criterion
    pub scalers_per_criterion: BTreeMap<String, usize>,

    /// Compared (user, criterion, entity) triples without a learned score
    pub dropped_entities: usize,

    /// Total runtime in seconds
    pub total_seconds: f64,
}

impl RunMetrics {
    /// Metrics with the input sizes of `state`
    pub fn new(state: &State) -> Self {
        Self {
            n_users: state.users.len(),
            n_entities: state.entities.len(),
            n_criteria: state.criteria().len(),
            n_comparisons: state.comparisons.len(),
            ..Self::default()
        }
    }

    /// Record a completed step
    pub fn record_step(&mut self, name: &str, seconds: f64) {
        self.steps.push(StepTiming {
            name: name.to_string(),
            seconds,
        });
        self.total_seconds += seconds;
    }

    /// Record the outputs of the final state
    pub fn record_outputs(&mut self, state: &State) {
        self.scalers_per_criterion.clear();
        for (keys, stats) in state.scaling_statistics.iter() {
            let count = self.scalers_per_criterion.entry(keys[1].clone()).or_insert(0);
            if stats.is_scaler {
                *count += 1;
            }
        }
        self.dropped_entities = dropped_entities(state);
    }

    /// Duration of a step, if it ran
    pub fn step_seconds(&self, name: &str) -> Option<f64> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.seconds)
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Pipeline Metrics Summary".to_string(),
            "========================".to_string(),
            format!("Users: {}", self.n_users),
            format!("Entities: {}", self.n_entities),
            format!("Criteria: {}", self.n_criteria),
            format!("Comparisons: {}", self.n_comparisons),
            format!("Dropped entities: {}", self.dropped_entities),
            format!("Total runtime: {:.2}s", self.total_seconds),
            String::new(),
        ];

        if !self.steps.is_empty() {
            lines.push("Steps:".to_string());
            for step in &self.steps {
                lines.push(format!("  {}: {:.2}s", step.name, step.seconds));
            }
            lines.push(String::new());
        }

        if !self.scalers_per_criterion.is_empty() {
            lines.push("Scalers per criterion:".to_string());
            for (criterion, count) in &self.scalers_per_criterion {
                lines.push(format!("  {}: {}", criterion, count));
            }
        }

        lines.join("\n")
    }
}

fn dropped_entities(state: &State) -> usize {
    let mut compared: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for (keys, _) in state.comparisons.iter() {
        let slot = compared.entry((keys[0].clone(), keys[1].clone())).or_default();
        slot.insert(keys[2].clone());
        slot.insert(keys[3].clone());
    }
    compared
        .iter()
        .map(|((username, criterion), entities)| {
            let model = state.user_models.get(username);
            entities
                .iter()
                .filter(|e| model.and_then(|m| m.direct(e, criterion)).is_none())
                .count()
        })
        .sum()
}

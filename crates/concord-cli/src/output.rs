//! Output formatting for the CLI.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use colored::*;
use concord_domain::State;
use concord_pipeline::{PipelineConfig, PipelineRun};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

use crate::cli::OutputFormat;
use crate::error::{CliError, Result};

/// Sizes of a loaded input directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    /// Users with a trust score
    pub users: usize,
    /// Known entities
    pub entities: usize,
    /// Criteria with at least one comparison
    pub criteria: usize,
    /// Stored comparisons
    pub comparisons: usize,
    /// Vouches between users
    pub vouches: usize,
    /// Direct assessments
    pub assessments: usize,
}

impl InputSummary {
    /// Count the inputs of `state`
    pub fn from_state(state: &State) -> Self {
        Self {
            users: state.users.len(),
            entities: state.entities.len(),
            criteria: state.criteria().len(),
            comparisons: state.comparisons.len(),
            vouches: state.vouches.len(),
            assessments: state.assessments.len(),
        }
    }
}

/// One row of the highest global scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopScore {
    /// Criterion
    pub criterion: String,
    /// Entity
    pub entity_name: String,
    /// Global score
    pub value: f64,
    /// Mean of left and right uncertainty
    pub uncertainty: f64,
}

/// The `n` highest global scores of each criterion, criteria in name order
pub fn top_scores(state: &State, n: usize) -> Vec<TopScore> {
    if n == 0 {
        return Vec::new();
    }
    let mut by_criterion: BTreeMap<String, Vec<TopScore>> = BTreeMap::new();
    for (keys, score) in state.global_model.directs().iter() {
        if score.is_nan() {
            continue;
        }
        by_criterion.entry(keys[1].clone()).or_default().push(TopScore {
            criterion: keys[1].clone(),
            entity_name: keys[0].clone(),
            value: score.value,
            uncertainty: score.average_uncertainty(),
        });
    }
    by_criterion
        .into_values()
        .flat_map(|mut scores| {
            scores.sort_by(|a, b| match b.value.total_cmp(&a.value) {
                Ordering::Equal => a.entity_name.cmp(&b.entity_name),
                other => other,
            });
            scores.truncate(n);
            scores
        })
        .collect()
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of a pipeline run.
    pub fn format_run(&self, run: &PipelineRun, output: &Path, top: usize) -> Result<String> {
        let top = top_scores(&run.state, top);
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "output": output.display().to_string(),
                "metrics": run.metrics,
                "top": top,
            }))?),
            OutputFormat::Table => {
                let m = &run.metrics;
                let mut sections = vec![
                    self.success(&format!("Outputs written to {}", output.display())),
                    key_value_table(&[
                        ("Users", m.n_users.to_string()),
                        ("Entities", m.n_entities.to_string()),
                        ("Criteria", m.n_criteria.to_string()),
                        ("Comparisons", m.n_comparisons.to_string()),
                        ("Dropped entities", m.dropped_entities.to_string()),
                        ("Total runtime", format!("{:.2}s", m.total_seconds)),
                    ]),
                ];

                let mut steps = Builder::default();
                steps.push_record(["Step", "Seconds"]);
                for step in &m.steps {
                    steps.push_record([step.name.clone(), format!("{:.3}", step.seconds)]);
                }
                sections.push(styled(steps));

                if !m.scalers_per_criterion.is_empty() {
                    let mut scalers = Builder::default();
                    scalers.push_record(["Criterion", "Scalers"]);
                    for (criterion, count) in &m.scalers_per_criterion {
                        scalers.push_record([criterion.clone(), count.to_string()]);
                    }
                    sections.push(styled(scalers));
                }
                if m.dropped_entities > 0 {
                    sections.push(self.warning(&format!(
                        "{} compared entities have no learned score",
                        m.dropped_entities
                    )));
                }
                if !top.is_empty() {
                    sections.push(top_table(&top));
                }
                Ok(sections.join("\n"))
            }
            OutputFormat::Quiet => Ok(String::new()),
        }
    }

    /// Format the summary of a validated input directory.
    pub fn format_inputs(&self, input: &Path, summary: &InputSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "input": input.display().to_string(),
                "valid": true,
                "summary": summary,
            }))?),
            OutputFormat::Table => Ok([
                self.success(&format!("{} is valid", input.display())),
                key_value_table(&[
                    ("Users", summary.users.to_string()),
                    ("Entities", summary.entities.to_string()),
                    ("Criteria", summary.criteria.to_string()),
                    ("Comparisons", summary.comparisons.to_string()),
                    ("Vouches", summary.vouches.to_string()),
                    ("Assessments", summary.assessments.to_string()),
                ]),
            ]
            .join("\n")),
            OutputFormat::Quiet => Ok(String::new()),
        }
    }

    /// Format a pipeline configuration: JSON in json mode, YAML otherwise.
    pub fn format_config(&self, config: &PipelineConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
            _ => config.to_yaml().map_err(CliError::from),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn key_value_table(rows: &[(&str, String)]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Metric", "Value"]);
    for (key, value) in rows {
        builder.push_record([key.to_string(), value.clone()]);
    }
    styled(builder)
}

fn top_table(top: &[TopScore]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Criterion", "Entity", "Score", "Uncertainty"]);
    for row in top {
        builder.push_record([
            row.criterion.clone(),
            row.entity_name.clone(),
            format!("{:.3}", row.value),
            format!("{:.3}", row.uncertainty),
        ]);
    }
    styled(builder)
}

fn styled(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

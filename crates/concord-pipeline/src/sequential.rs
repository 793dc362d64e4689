//! Sequential orchestration of the pipeline steps

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use concord_domain::{CancelToken, State, StateFunction};
use concord_gbt::PreferenceLearner;
use concord_mehestan::Mehestan;
use concord_store::{InputDir, OutputDir};
use concord_voting::{AffineOvertrust, EntitywiseQrQuantile};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::RunMetrics;

/// File name of the metrics report in the output directory
pub const RUN_METRICS_FILE: &str = "run_metrics.json";

/// Final state and metrics of a run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// State after the last step
    pub state: State,
    /// Timings and counts
    pub metrics: RunMetrics,
}

/// Runs preference learning, voting rights, scaling and aggregation in order
///
/// Steps run inside a dedicated worker pool of `max_workers` threads. The
/// input state is never modified; a cancelled or failed run returns no
/// state at all and removes the snapshots it already wrote.
///
/// # Examples
///
/// ```
/// use concord_domain::{Comparison, Comparisons, MadePublic, State, User, Users};
/// use concord_pipeline::{PipelineConfig, Sequential};
///
/// let users: Users = vec![User::new("alice", 1.0, true)].into_iter().collect();
/// let mut comparisons = Comparisons::new();
/// comparisons.add("alice", "importance", "a", "b", Comparison::new(-5.0, 5.0).unwrap());
/// let state = State::from_inputs(users, comparisons, MadePublic::all_public());
///
/// let run = Sequential::new(PipelineConfig::default()).run(&state).unwrap();
/// let a = run.state.global_model.direct("a", "importance").unwrap();
/// let b = run.state.global_model.direct("b", "importance").unwrap();
/// assert!(a.value > b.value);
/// ```
#[derive(Debug, Clone)]
pub struct Sequential {
    config: PipelineConfig,
    cancel: CancelToken,
    output: Option<OutputDir>,
}

impl Sequential {
    /// Create a pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            output: None,
        }
    }

    /// Share a cancellation token with the caller
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Directory receiving snapshots when `snapshot` is enabled
    pub fn with_output(mut self, output: OutputDir) -> Self {
        self.output = Some(output);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that cancels this pipeline
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run every step on `state`
    pub fn run(&self, state: &State) -> Result<PipelineRun, PipelineError> {
        self.config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;
        info!(
            "Running pipeline on {} threads (seed {})",
            pool.current_num_threads(),
            self.config.seed
        );
        pool.install(|| self.run_steps(state))
    }

    /// Load `input`, run, and write every output into `output`
    pub fn run_directory<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<PipelineRun, PipelineError> {
        self.config.validate()?;
        let state = InputDir::new(input).load()?;
        let out = OutputDir::create(output)?;
        let pipeline = self.clone().with_output(out.clone());

        let run = pipeline.run(&state)?;
        out.write_state(&run.state)?;
        out.write_json(RUN_METRICS_FILE, &run.metrics)?;
        Ok(run)
    }

    fn run_steps(&self, input: &State) -> Result<PipelineRun, PipelineError> {
        self.discarding_on_error(|snapshots| self.run_all(input, snapshots))
    }

    /// Run `body`, removing the snapshots it recorded if it fails
    fn discarding_on_error<T, F>(&self, body: F) -> Result<T, PipelineError>
    where
        F: FnOnce(&mut Vec<PathBuf>) -> Result<T, PipelineError>,
    {
        let mut snapshots = Vec::new();
        let result = body(&mut snapshots);
        if result.is_err() {
            discard_snapshots(&snapshots);
        }
        result
    }

    fn run_all(&self, input: &State, snapshots: &mut Vec<PathBuf>) -> Result<PipelineRun, PipelineError> {
        let config = &self.config;
        let mut metrics = RunMetrics::new(input);

        let learner = PreferenceLearner::new(config.preference_learning.clone())
            .with_seed(config.seed)
            .with_cancel_token(self.cancel.clone());
        let voting = AffineOvertrust::new(config.voting_rights.clone()).with_cancel_token(self.cancel.clone());
        let scaling = Mehestan::new(config.scaling.clone())
            .with_seed(config.seed)
            .with_cancel_token(self.cancel.clone());
        let aggregation = EntitywiseQrQuantile::new(config.aggregation.clone()).with_cancel_token(self.cancel.clone());

        let state = self.step(1, &learner, input, &mut metrics, snapshots)?;
        let state = self.step(2, &voting, &state, &mut metrics, snapshots)?;
        let state = self.step(3, &scaling, &state, &mut metrics, snapshots)?;
        let state = self.step(4, &aggregation, &state, &mut metrics, snapshots)?;

        metrics.record_outputs(&state);
        info!("Pipeline finished in {:.2}s", metrics.total_seconds);
        Ok(PipelineRun { state, metrics })
    }

    fn step<F>(
        &self,
        index: usize,
        function: &F,
        state: &State,
        metrics: &mut RunMetrics,
        snapshots: &mut Vec<PathBuf>,
    ) -> Result<State, PipelineError>
    where
        F: StateFunction,
        PipelineError: From<F::Error>,
    {
        self.check_cancelled()?;
        let start = Instant::now();
        let next = function.apply(state)?;
        let seconds = start.elapsed().as_secs_f64();
        metrics.record_step(function.name(), seconds);
        info!("Step {} '{}' done in {:.2}s", index, function.name(), seconds);

        if self.config.snapshot {
            if let Some(output) = &self.output {
                let dir = output.snapshot(index, function.name(), &next)?;
                debug!("Snapshot written to {}", dir.display());
                snapshots.push(dir);
            }
        }
        Ok(next)
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn discard_snapshots(snapshots: &[PathBuf]) {
    for dir in snapshots {
        match fs::remove_dir_all(dir) {
            Ok(()) => debug!("Discarded snapshot {}", dir.display()),
            Err(e) => warn!("Could not discard snapshot {}: {}", dir.display(), e),
        }
    }
    // Only an empty parent is removed
    if let Some(parent) = snapshots.first().and_then(|dir| dir.parent()) {
        if let Err(e) = fs::remove_dir(parent) {
            debug!("Kept {}: {}", parent.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::{Comparison, Comparisons, MadePublic, User, Users};
    use concord_store::SNAPSHOTS_DIR;
    use tempfile::TempDir;

    struct Unchanged;

    impl StateFunction for Unchanged {
        type Error = PipelineError;

        fn name(&self) -> &'static str {
            "unchanged"
        }

        fn apply(&self, state: &State) -> Result<State, PipelineError> {
            Ok(state.clone())
        }
    }

    struct Failing;

    impl StateFunction for Failing {
        type Error = PipelineError;

        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, _state: &State) -> Result<State, PipelineError> {
            Err(PipelineError::Cancelled)
        }
    }

    fn state() -> State {
        let users: Users = vec![User::new("alice", 1.0, false)].into_iter().collect();
        let mut comparisons = Comparisons::new();
        comparisons.add("alice", "importance", "a", "b", Comparison::new(-1.0, 10.0).unwrap());
        State::from_inputs(users, comparisons, MadePublic::all_public())
    }

    fn snapshotting(dir: &TempDir) -> Sequential {
        let config = PipelineConfig {
            snapshot: true,
            ..PipelineConfig::default()
        };
        Sequential::new(config).with_output(OutputDir::create(dir.path()).unwrap())
    }

    #[test]
    fn test_failed_run_discards_its_snapshots() {
        let dir = TempDir::new().unwrap();
        let pipeline = snapshotting(&dir);
        let state = state();
        let mut metrics = RunMetrics::new(&state);

        let result = pipeline.discarding_on_error(|snapshots| {
            let next = pipeline.step(1, &Unchanged, &state, &mut metrics, snapshots)?;
            assert!(dir.path().join(SNAPSHOTS_DIR).join("01_unchanged").is_dir());
            pipeline.step(2, &Failing, &next, &mut metrics, snapshots)
        });

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(!dir.path().join(SNAPSHOTS_DIR).exists());
    }

    #[test]
    fn test_older_snapshots_survive_a_failed_run() {
        let dir = TempDir::new().unwrap();
        let older = dir.path().join(SNAPSHOTS_DIR).join("01_previous");
        fs::create_dir_all(&older).unwrap();
        let pipeline = snapshotting(&dir);
        let state = state();
        let mut metrics = RunMetrics::new(&state);

        let result = pipeline.discarding_on_error(|snapshots| {
            let next = pipeline.step(1, &Unchanged, &state, &mut metrics, snapshots)?;
            pipeline.step(2, &Failing, &next, &mut metrics, snapshots)
        });

        assert!(result.is_err());
        assert!(older.is_dir());
        assert!(!dir.path().join(SNAPSHOTS_DIR).join("01_unchanged").exists());
    }

    #[test]
    fn test_successful_run_keeps_snapshots() {
        let dir = TempDir::new().unwrap();
        let pipeline = snapshotting(&dir);

        pipeline.run(&state()).unwrap();
        assert!(dir.path().join(SNAPSHOTS_DIR).join("04_aggregation").is_dir());
    }
}

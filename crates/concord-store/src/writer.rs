//! Writing pipeline outputs

use std::fs;
use std::path::{Path, PathBuf};

use concord_domain::table::format_float;
use concord_domain::{MultiKeyTable, State, TableValue};
use serde::Serialize;
use tracing::{debug, info};

use crate::StoreError;

/// Per-user direct scores
pub const DIRECTS_FILE: &str = "directs.csv";
/// Per-user scalings
pub const SCALINGS_FILE: &str = "scalings.csv";
/// Global scores
pub const GLOBAL_FILE: &str = "global.csv";
/// Voting rights
pub const VOTING_RIGHTS_FILE: &str = "voting_rights.csv";
/// Voting statistics per (entity, criterion)
pub const VOTING_STATISTICS_FILE: &str = "voting_statistics.csv";
/// Scaling statistics per (user, criterion)
pub const SCALING_STATISTICS_FILE: &str = "scaling_statistics.csv";
/// Subdirectory holding intermediate states
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// A directory receiving pipeline outputs
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Output directory at `root`, created if missing
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every output table of `state`, returning the written paths
    pub fn write_state(&self, state: &State) -> Result<Vec<PathBuf>, StoreError> {
        let mut written = vec![
            self.write_table(DIRECTS_FILE, &state.user_models.directs_table())?,
            self.write_scalings(state)?,
            self.write_table(GLOBAL_FILE, state.global_model.directs())?,
            self.write_table(VOTING_RIGHTS_FILE, state.voting_rights.table())?,
            self.write_table(VOTING_STATISTICS_FILE, &state.voting_statistics)?,
            self.write_table(SCALING_STATISTICS_FILE, &state.scaling_statistics)?,
        ];
        written.sort();
        info!("Wrote {} output files to {}", written.len(), self.root.display());
        Ok(written)
    }

    /// Write `state` under `snapshots/<index>_<step>/`
    pub fn snapshot(&self, index: usize, step: &str, state: &State) -> Result<PathBuf, StoreError> {
        let dir = self.root.join(SNAPSHOTS_DIR).join(format!("{:02}_{}", index, step));
        let snapshot = OutputDir::create(&dir)?;
        snapshot.write_state(state)?;
        debug!("Snapshot of '{}' written to {}", step, dir.display());
        Ok(dir)
    }

    /// Write any flat table under `file_name`
    pub fn write_table<V: TableValue>(&self, file_name: &str, table: &MultiKeyTable<V>) -> Result<PathBuf, StoreError> {
        let path = self.root.join(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(table.header())?;
        for row in table.to_rows() {
            writer.write_record(&row)?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Serialize `value` as pretty JSON under `file_name`
    pub fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.root.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn write_scalings(&self, state: &State) -> Result<PathBuf, StoreError> {
        let path = self.root.join(SCALINGS_FILE);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["username", "kind", "criterion", "value", "left_unc", "right_unc"])?;
        for (username, scaling) in state.user_models.scalings() {
            writer.write_record([
                username.to_string(),
                scaling.kind.as_str().to_string(),
                scaling.criterion.clone(),
                format_float(scaling.score.value),
                format_float(scaling.score.left_unc),
                format_float(scaling.score.right_unc),
            ])?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_table;
    use concord_domain::{Score, ScalingKind, ScoringModel};
    use tempfile::TempDir;

    fn scored_state() -> State {
        let mut state = State::default();
        let model = state.user_models.entry("alice");
        model.set_direct("a", "importance", Score::new(1.5, 0.25, 0.5));
        model.set_direct("b", "importance", Score::nan());
        model.add_scaling(ScalingKind::Multiplier, "importance", Score::exact(2.0));
        let mut global = ScoringModel::new();
        global.set_direct("a", "importance", Score::new(0.5, f64::INFINITY, 1.0));
        state.global_model = global;
        state.voting_rights.set("alice", "a", "importance", 1.0);
        state
    }

    #[test]
    fn test_write_state_creates_every_file() {
        let dir = TempDir::new().unwrap();
        let out = OutputDir::create(dir.path().join("out")).unwrap();
        let written = out.write_state(&scored_state()).unwrap();

        assert_eq!(written.len(), 6);
        for file in [
            DIRECTS_FILE,
            SCALINGS_FILE,
            GLOBAL_FILE,
            VOTING_RIGHTS_FILE,
            VOTING_STATISTICS_FILE,
            SCALING_STATISTICS_FILE,
        ] {
            assert!(out.root().join(file).is_file(), "{} missing", file);
        }
    }

    #[test]
    fn test_directs_header_and_special_floats() {
        let dir = TempDir::new().unwrap();
        let out = OutputDir::create(dir.path()).unwrap();
        out.write_state(&scored_state()).unwrap();

        let directs = fs::read_to_string(out.root().join(DIRECTS_FILE)).unwrap();
        let mut lines = directs.lines();
        assert_eq!(
            lines.next(),
            Some("username,entity_name,criterion,value,left_unc,right_unc")
        );
        assert_eq!(lines.next(), Some("alice,a,importance,1.5,0.25,0.5"));
        assert_eq!(lines.next(), Some("alice,b,importance,nan,inf,inf"));

        let global = fs::read_to_string(out.root().join(GLOBAL_FILE)).unwrap();
        assert!(global.contains("a,importance,0.5,inf,1"));

        let scalings = fs::read_to_string(out.root().join(SCALINGS_FILE)).unwrap();
        assert!(scalings.contains("alice,multiplier,importance,2,0,0"));

        let rights = fs::read_to_string(out.root().join(VOTING_RIGHTS_FILE)).unwrap();
        assert!(rights.starts_with("username,entity_name,criterion,voting_right"));
    }

    #[test]
    fn test_written_table_reads_back() {
        let dir = TempDir::new().unwrap();
        let out = OutputDir::create(dir.path()).unwrap();
        let state = scored_state();
        let path = out.write_table(GLOBAL_FILE, state.global_model.directs()).unwrap();

        let table: MultiKeyTable<Score> = read_table(&path, &ScoringModel::KEYNAMES).unwrap();
        let score = table.get(&["a", "importance"]).unwrap();
        assert_eq!(score.value, 0.5);
        assert!(score.left_unc.is_infinite());
    }

    #[test]
    fn test_snapshot_directory_layout() {
        let dir = TempDir::new().unwrap();
        let out = OutputDir::create(dir.path()).unwrap();
        let snapshot = out.snapshot(1, "preference_learning", &scored_state()).unwrap();
        assert!(snapshot.ends_with("snapshots/01_preference_learning"));
        assert!(snapshot.join(DIRECTS_FILE).is_file());
    }

    #[test]
    fn test_write_json() {
        let dir = TempDir::new().unwrap();
        let out = OutputDir::create(dir.path()).unwrap();
        let path = out.write_json("run_metrics.json", &vec![1, 2, 3]).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains('2'));
    }
}

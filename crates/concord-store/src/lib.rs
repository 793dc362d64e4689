//! Concord Storage Layer
//!
//! Flat CSV files in, flat CSV files out.
//!
//! # Architecture
//!
//! - [`InputDir`] loads `users.csv` and `comparisons.csv` (required) plus
//!   `made_public.csv`, `entities.csv`, `vouches.csv` and `assessments.csv`
//!   (optional) into a [`concord_domain::State`]
//! - [`OutputDir`] writes user models, global scores, voting rights and
//!   statistics, per-step snapshots and JSON reports
//! - Floats are written with full precision, NaN as `nan` and infinities
//!   as `inf`/`-inf`
//!
//! # Examples
//!
//! ```no_run
//! use concord_store::{InputDir, OutputDir};
//!
//! let state = InputDir::new("inputs").load().unwrap();
//! let out = OutputDir::create("outputs").unwrap();
//! out.write_state(&state).unwrap();
//! ```

#![warn(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

mod reader;
mod writer;

pub use reader::{
    read_table, InputDir, ASSESSMENTS_FILE, COMPARISONS_FILE, ENTITIES_FILE, MADE_PUBLIC_FILE, USERS_FILE,
    VOUCHES_FILE,
};
pub use writer::{
    OutputDir, DIRECTS_FILE, GLOBAL_FILE, SCALINGS_FILE, SCALING_STATISTICS_FILE, SNAPSHOTS_DIR,
    VOTING_RIGHTS_FILE, VOTING_STATISTICS_FILE,
};

/// Errors that can occur while reading inputs or writing outputs
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required input file is absent
    #[error("Missing input file: {}", .0.display())]
    MissingFile(PathBuf),

    /// A required column is absent from a file
    #[error("{file}: missing column '{column}'")]
    MissingColumn {
        /// File name
        file: String,
        /// Column name
        column: String,
    },

    /// A field could not be parsed
    #[error("{file}:{line}: {message}")]
    InvalidValue {
        /// File name
        file: String,
        /// 1-based line of the record
        line: u64,
        /// What was wrong
        message: String,
    },

    /// Malformed CSV or failed CSV I/O
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

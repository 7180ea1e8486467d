//! Error types for the TMSim library
//!
//! The numeric core never fails: it clamps. Errors only come from
//! configuration, missing collaborators and file input/output.

use std::path::PathBuf;

/// Errors raised by TMSim workflows
#[derive(Debug, thiserror::Error)]
pub enum TmSimError {
    #[error("no ABG model configured: attach one with `with_model` before running")]
    ModelNotConfigured,

    #[error("dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing column '{0}' in CSV header")]
    MissingColumn(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("no file matching '{prefix}_*.csv' in {dir}")]
    NoInputFile { prefix: String, dir: PathBuf },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Env(#[from] tmsim_env::EnvError),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, TmSimError>;

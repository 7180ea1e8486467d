//! Environment variable utilities for TMSim
//!
//! This module provides utilities for handling environment variables,
//! particularly the TMSIM_DIR variable that points to the TMSim project root,
//! and for resolving the directory where generated tables are written.

use crate::constants::DATA_GENERATED;
use std::env;
use std::path::{Path, PathBuf};

/// Error type for environment variable issues
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error(
        "TMSIM_DIR environment variable is not set. Please set it to the TMSim project root directory (e.g., export TMSIM_DIR=/path/to/tmsim)"
    )]
    TmsimDirNotSet,

    #[error("TMSIM_DIR points to a non-existent directory: {0}")]
    TmsimDirNotFound(PathBuf),

    #[error("Failed to create output directory {0}: {1}")]
    OutputDirCreationFailed(PathBuf, std::io::Error),
}

fn tmsim_dir_from(value: Option<String>) -> Result<PathBuf, EnvError> {
    let tmsim_dir = value.ok_or(EnvError::TmsimDirNotSet)?;

    let path = PathBuf::from(tmsim_dir);

    if !path.exists() {
        return Err(EnvError::TmsimDirNotFound(path));
    }

    Ok(path)
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, EnvError> {
    if !path.exists() {
        std::fs::create_dir_all(&path)
            .map_err(|e| EnvError::OutputDirCreationFailed(path.clone(), e))?;
    }
    Ok(path)
}

/// Get the TMSIM_DIR environment variable and validate it exists
///
/// # Errors
///
/// Returns an error if:
/// - TMSIM_DIR is not set
/// - TMSIM_DIR points to a non-existent directory
///
/// # Example
///
/// ```no_run
/// use tmsim_env::env_utils::get_tmsim_dir;
///
/// let tmsim_dir = get_tmsim_dir()?;
/// println!("TMSim directory: {}", tmsim_dir.display());
/// # Ok::<(), tmsim_env::env_utils::EnvError>(())
/// ```
pub fn get_tmsim_dir() -> Result<PathBuf, EnvError> {
    tmsim_dir_from(env::var("TMSIM_DIR").ok())
}

/// Get the path to the data_generated directory, creating it if necessary
///
/// # Errors
///
/// Returns an error if TMSIM_DIR is not set or invalid, or if the
/// data_generated directory cannot be created.
pub fn get_data_generated_dir() -> Result<PathBuf, EnvError> {
    let tmsim_dir = get_tmsim_dir()?;
    ensure_dir(tmsim_dir.join(DATA_GENERATED))
}

/// Resolve the directory that receives exported tables
///
/// Resolution order:
/// 1. `explicit` when given (created if missing)
/// 2. `$TMSIM_DIR/data_generated` when TMSIM_DIR is set
/// 3. the current working directory
///
/// # Example
///
/// ```no_run
/// use tmsim_env::env_utils::resolve_output_dir;
///
/// let out = resolve_output_dir(None)?;
/// println!("Writing tables to {}", out.display());
/// # Ok::<(), tmsim_env::env_utils::EnvError>(())
/// ```
pub fn resolve_output_dir(explicit: Option<&Path>) -> Result<PathBuf, EnvError> {
    if let Some(dir) = explicit {
        return ensure_dir(dir.to_path_buf());
    }
    match get_data_generated_dir() {
        Ok(dir) => Ok(dir),
        Err(EnvError::TmsimDirNotSet) => Ok(PathBuf::from(".")),
        Err(e) => Err(e),
    }
}

//! TMSim Environment and Constants
//!
//! This crate provides shared environment utilities and constants for the TMSim workspace.
//! It centralizes environment variable handling and the output file naming that the
//! simulator binary and the analysis tooling agree on.

pub mod constants;
pub mod env_utils;

// Re-export commonly used items
pub use constants::{
    DATA_GENERATED, EXPERIMENT_FULL_PREFIX, EXPERIMENT_SUMMARY_PREFIX, SINGLE_RUN_PREFIX,
};
pub use env_utils::{EnvError, get_data_generated_dir, get_tmsim_dir, resolve_output_dir};

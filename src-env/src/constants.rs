//! Constants shared by every TMSim workspace member

/// Name of the directory (below `TMSIM_DIR`) where generated tables are written
pub const DATA_GENERATED: &str = "data_generated";

/// File name prefix of the full per-combination sweep table
pub const EXPERIMENT_FULL_PREFIX: &str = "Experiment_Full";

/// File name prefix of the grade/volume averaged sweep table
pub const EXPERIMENT_SUMMARY_PREFIX: &str = "Experiment_Summary";

/// File name prefix of a single-configuration frequency response export
pub const SINGLE_RUN_PREFIX: &str = "ABG_Result";

//! TMSim - Air-bone gap simulation for tympanic membrane perforations
//! Command-line interface definitions
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::constants::{
    DEFAULT_GRID_SIZE, DEFAULT_TYMPANIC_AREA_MM2, MAX_GRADE, NORMAL_MIDDLE_EAR_VOLUME_CM3,
};
use crate::model::{AbgModel, EarModel};
use crate::propagation::TransmissionModel;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// ABG model selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// Physical terms blended with literature data
    Ear,
    /// Leakage and transmission-efficiency formulation
    Transmission,
}

impl ModelKind {
    pub fn build(self) -> Arc<dyn AbgModel> {
        match self {
            ModelKind::Ear => Arc::new(EarModel),
            ModelKind::Transmission => Arc::new(TransmissionModel::default()),
        }
    }
}

/// CLI arguments for the tmsim binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory for generated CSV and JSON files.
    /// Defaults to $TMSIM_DIR/data_generated, or the current directory when TMSIM_DIR is unset.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// ABG model to evaluate.
    #[arg(long, value_enum, default_value_t = ModelKind::Ear, global = true)]
    pub model: ModelKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Frequency response of one perforation configuration
    Single(SingleArgs),
    /// Sweep grade, position and middle-ear volume
    Sweep(SweepArgs),
    /// Score the model against patient audiograms
    Validate(ValidateArgs),
    /// Compare a saved full sweep with clinical data
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct SingleArgs {
    /// Perforation grade (0 = intact .. 4 = subtotal).
    #[arg(short, long, default_value_t = 2, allow_negative_numbers = true)]
    pub grade: i64,

    /// Perforation centre, anterior (0) to posterior (1).
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub pos_x: f64,

    /// Perforation centre, inferior (0) to superior (1).
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub pos_y: f64,

    /// Middle-ear volume in cm³.
    #[arg(long, default_value_t = NORMAL_MIDDLE_EAR_VOLUME_CM3, value_parser = parse_strictly_positive_f64)]
    pub volume: f64,

    /// Tympanic membrane area in mm².
    #[arg(long, default_value_t = DEFAULT_TYMPANIC_AREA_MM2, value_parser = parse_strictly_positive_f64)]
    pub area: f64,

    /// Write the response to this CSV file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the response to a timestamped CSV in the output directory.
    #[arg(long, default_value_t = false)]
    pub save: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SweepArgs {
    /// Grid lines per axis over the membrane.
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE)]
    pub grid_size: usize,

    /// Middle-ear volumes in cm³, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "0.5,0.8,1.2", value_parser = parse_strictly_positive_f64)]
    pub volumes: Vec<f64>,

    /// Tympanic membrane area in mm².
    #[arg(long, default_value_t = DEFAULT_TYMPANIC_AREA_MM2, value_parser = parse_strictly_positive_f64)]
    pub area: f64,

    /// Pause between two combinations in milliseconds (0 runs in batch mode).
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Evaluate combinations on all cores.
    #[arg(long, default_value_t = false)]
    pub parallel: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Patient CSV (Id,Grade,Ear,Frequency_Hz,ABG_dB[,Group]). Defaults to the built-in clinical set.
    #[arg(long)]
    pub patients: Option<PathBuf>,

    /// Middle-ear volume in cm³ used for every patient.
    #[arg(long, default_value_t = NORMAL_MIDDLE_EAR_VOLUME_CM3, value_parser = parse_strictly_positive_f64)]
    pub volume: f64,

    /// Tympanic membrane area in mm² used for every patient.
    #[arg(long, default_value_t = DEFAULT_TYMPANIC_AREA_MM2, value_parser = parse_strictly_positive_f64)]
    pub area: f64,

    /// Write the validation report to this JSON file.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Full sweep CSV. Defaults to the newest Experiment_Full_*.csv in the output directory.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Patient CSV used as clinical reference. Defaults to the built-in clinical set.
    #[arg(long)]
    pub patients: Option<PathBuf>,

    /// Write the analysis report to this JSON file.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

fn check_file(path: &Option<PathBuf>, what: &str) -> Result<(), String> {
    match path {
        Some(p) if !p.is_file() => Err(format!("{} file not found: {}", what, p.display())),
        _ => Ok(()),
    }
}

/// Validate CLI arguments, returning a message for the first problem found
pub fn validate_args(args: &Args) -> Result<(), String> {
    match &args.command {
        Command::Single(a) => {
            if a.grade < 0 || a.grade > MAX_GRADE as i64 {
                return Err(format!(
                    "Invalid grade: {}. Must be in range [0..{}]",
                    a.grade, MAX_GRADE
                ));
            }
            if !(0.0..=1.0).contains(&a.pos_x) || !(0.0..=1.0).contains(&a.pos_y) {
                return Err(format!(
                    "Invalid position: ({}, {}). Both coordinates must be in [0, 1]",
                    a.pos_x, a.pos_y
                ));
            }
        }
        Command::Sweep(a) => {
            if a.grid_size == 0 {
                return Err("Grid size must be > 0".to_string());
            }
            if a.grid_size > 50 {
                return Err(format!(
                    "Grid size ({}) is very high. Consider using <= 50 lines per axis",
                    a.grid_size
                ));
            }
            if a.volumes.is_empty() {
                return Err("At least one middle-ear volume is required".to_string());
            }
            if a.parallel && a.delay_ms > 0 {
                return Err("--delay-ms cannot be combined with --parallel".to_string());
            }
        }
        Command::Validate(a) => check_file(&a.patients, "Patient")?,
        Command::Analyze(a) => {
            check_file(&a.input, "Sweep")?;
            check_file(&a.patients, "Patient")?;
        }
    }
    Ok(())
}

/// Validate arguments and exit with error if validation fails
pub fn validate_args_or_exit(args: &Args) {
    if let Err(error) = validate_args(args) {
        eprintln!("❌ Validation Error: {}", error);
        process::exit(1);
    }
}

// Custom value parser to enforce strictly positive f64
fn parse_strictly_positive_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s.trim().parse().map_err(|_| format!("invalid float: {s}"))?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err("value must be strictly positive (> 0)".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(args: &Args) -> &SingleArgs {
        match &args.command {
            Command::Single(a) => a,
            other => panic!("expected single, got {:?}", other),
        }
    }

    fn sweep(args: &Args) -> &SweepArgs {
        match &args.command {
            Command::Sweep(a) => a,
            other => panic!("expected sweep, got {:?}", other),
        }
    }

    #[test]
    fn parse_single_defaults() {
        let args = Args::parse_from(["tmsim-test", "single"]);
        assert_eq!(args.model, ModelKind::Ear);
        let a = single(&args);
        assert_eq!(a.grade, 2);
        assert_eq!((a.pos_x, a.pos_y), (0.5, 0.5));
        assert_eq!(a.volume, 0.8);
        assert_eq!(a.area, 85.0);
        assert!(a.output.is_none());
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn parse_sweep_defaults() {
        let args = Args::parse_from(["tmsim-test", "sweep"]);
        let a = sweep(&args);
        assert_eq!(a.grid_size, 5);
        assert_eq!(a.volumes, vec![0.5, 0.8, 1.2]);
        assert_eq!(a.delay_ms, 0);
        assert!(!a.parallel);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn parse_sweep_volume_list() {
        let args = Args::parse_from(["tmsim-test", "sweep", "--volumes", "0.4,1.0", "--grid-size", "3"]);
        let a = sweep(&args);
        assert_eq!(a.volumes, vec![0.4, 1.0]);
        assert_eq!(a.grid_size, 3);
    }

    #[test]
    fn global_model_after_subcommand() {
        let args = Args::parse_from(["tmsim-test", "validate", "--model", "transmission"]);
        assert_eq!(args.model, ModelKind::Transmission);
        assert_eq!(args.model.build().name(), "transmission");
    }

    #[test]
    fn volume_must_be_strictly_positive() {
        assert!(Args::try_parse_from(["tmsim-test", "single", "--volume", "0.0"]).is_err());
        assert!(Args::try_parse_from(["tmsim-test", "sweep", "--volumes", "0.8,-1"]).is_err());
        assert!(Args::try_parse_from(["tmsim-test", "single", "--area", "abc"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["tmsim-test"]).is_err());
    }

    #[test]
    fn validate_args_grade_out_of_range() {
        let args = Args::parse_from(["tmsim-test", "single", "--grade", "5"]);
        let result = validate_args(&args);
        assert!(result.unwrap_err().contains("Invalid grade"));
        let args = Args::parse_from(["tmsim-test", "single", "--grade", "-1"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn validate_args_position_out_of_range() {
        let args = Args::parse_from(["tmsim-test", "single", "--pos-x", "1.5"]);
        let result = validate_args(&args);
        assert!(result.unwrap_err().contains("Invalid position"));
    }

    #[test]
    fn validate_args_zero_grid() {
        let args = Args::parse_from(["tmsim-test", "sweep", "--grid-size", "0"]);
        assert!(validate_args(&args).unwrap_err().contains("Grid size must be > 0"));
        let args = Args::parse_from(["tmsim-test", "sweep", "--grid-size", "100"]);
        assert!(validate_args(&args).unwrap_err().contains("very high"));
    }

    #[test]
    fn validate_args_parallel_with_delay() {
        let args = Args::parse_from(["tmsim-test", "sweep", "--parallel", "--delay-ms", "10"]);
        assert!(validate_args(&args).unwrap_err().contains("cannot be combined"));
    }

    #[test]
    fn validate_args_missing_files() {
        let args = Args::parse_from(["tmsim-test", "validate", "--patients", "/nonexistent/patients.csv"]);
        assert!(validate_args(&args).unwrap_err().contains("Patient file not found"));
        let args = Args::parse_from(["tmsim-test", "analyze", "--input", "/nonexistent/sweep.csv"]);
        assert!(validate_args(&args).unwrap_err().contains("Sweep file not found"));
    }
}

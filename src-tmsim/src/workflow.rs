//! Shared workflow helpers used by the tmsim binary
//!
//! Each `run_*` function takes parsed CLI arguments, drives the library and
//! writes its tables; printing is left to the caller.

use crate::analysis::{self, AnalysisReport};
use crate::cli::{AnalyzeArgs, SingleArgs, SweepArgs, ValidateArgs};
use crate::error::Result;
use crate::export;
use crate::model::AbgModel;
use crate::simulator::{EarSimulator, SingleRun};
use crate::sweep::{CancelToken, ExecutionMode, SweepConfig, SweepReport, SweepRunner};
use crate::validation::{self, GradeComparison, PatientRecord, PatientValidator, ValidationSummary};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tmsim_env::{EXPERIMENT_FULL_PREFIX, EXPERIMENT_SUMMARY_PREFIX, SINGLE_RUN_PREFIX};

/// Directory receiving generated files, see [`tmsim_env::resolve_output_dir`]
pub fn output_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    Ok(tmsim_env::resolve_output_dir(explicit)?)
}

/// Write any serializable report as pretty JSON
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    log::info!("wrote report to {}", path.display());
    Ok(())
}

/// Compute one frequency response and optionally save it
///
/// `--output` wins over `--save`; with neither nothing is written.
pub fn run_single(
    model: Arc<dyn AbgModel>,
    args: &SingleArgs,
    out_dir: &Path,
) -> Result<(SingleRun, Option<PathBuf>)> {
    let mut sim = EarSimulator::new(model);
    sim.set_perforation_grade(args.grade);
    sim.set_perforation_position(args.pos_x, args.pos_y);
    sim.set_middle_ear_volume(args.volume);
    sim.set_tympanic_area(args.area);
    let run = sim.single_run();

    let path = match (&args.output, args.save) {
        (Some(p), _) => Some(p.clone()),
        (None, true) => Some(out_dir.join(export::timestamped_filename(SINGLE_RUN_PREFIX))),
        (None, false) => None,
    };
    if let Some(p) = &path {
        export::save_single_run(p, &run)?;
    }
    Ok((run, path))
}

/// Sweep configuration from CLI arguments
pub fn sweep_config(args: &SweepArgs) -> SweepConfig {
    let mode = if args.delay_ms > 0 {
        ExecutionMode::Paced { delay: Duration::from_millis(args.delay_ms) }
    } else {
        ExecutionMode::Batch
    };
    SweepConfig::builder()
        .grid_size(args.grid_size)
        .volumes(args.volumes.clone())
        .tympanic_area(args.area)
        .mode(mode)
        .build()
}

/// Files written by [`run_sweep`]
#[derive(Debug)]
pub struct SweepOutputs {
    pub report: SweepReport,
    pub full_csv: PathBuf,
    pub summary_csv: PathBuf,
}

/// Run a sweep and save the full and summary tables
///
/// A cancelled sweep still writes whatever rows it collected.
pub fn run_sweep(
    model: Arc<dyn AbgModel>,
    args: &SweepArgs,
    out_dir: &Path,
    cancel: CancelToken,
) -> Result<SweepOutputs> {
    let runner = SweepRunner::new(model, sweep_config(args))?.with_cancel_token(cancel);
    let report = if args.parallel { runner.run_parallel() } else { runner.run() };

    let full_csv = out_dir.join(export::timestamped_filename(EXPERIMENT_FULL_PREFIX));
    let summary_csv = out_dir.join(export::timestamped_filename(EXPERIMENT_SUMMARY_PREFIX));
    export::save_full_sweep(&full_csv, &report.results)?;
    export::save_summary(&summary_csv, &report.summary())?;

    Ok(SweepOutputs { report, full_csv, summary_csv })
}

/// Patients from a CSV file, or the built-in clinical set
pub fn load_patients(path: Option<&Path>) -> Result<Vec<PatientRecord>> {
    match path {
        Some(p) => validation::load_patients_csv(p),
        None => Ok(validation::clinical_dataset()),
    }
}

/// Outcome of [`run_validation`]
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutputs {
    pub summary: ValidationSummary,
    pub grades: Vec<GradeComparison>,
}

/// Validate `model` against patients and optionally save a JSON report
pub fn run_validation(model: Arc<dyn AbgModel>, args: &ValidateArgs) -> Result<ValidationOutputs> {
    let patients = load_patients(args.patients.as_deref())?;
    let validator = PatientValidator::new(patients)
        .with_middle_ear_volume(args.volume)
        .with_tympanic_area(args.area)
        .with_model(model);
    let outputs = ValidationOutputs {
        summary: validator.run_validation()?,
        grades: validator.compare_by_grade()?,
    };
    if let Some(path) = &args.json {
        save_json(path, &outputs)?;
    }
    Ok(outputs)
}

/// Analyse a saved full sweep against clinical data
///
/// Returns the sweep file that was read along with the report.
pub fn run_analysis(args: &AnalyzeArgs, out_dir: &Path) -> Result<(PathBuf, AnalysisReport)> {
    let input = match &args.input {
        Some(p) => p.clone(),
        None => export::find_latest(out_dir, EXPERIMENT_FULL_PREFIX)?,
    };
    let results = export::read_full_sweep_csv(&input)?;
    let patients = load_patients(args.patients.as_deref())?;
    let report = analysis::analyze(&results, &patients);
    if let Some(path) = &args.json {
        save_json(path, &report)?;
    }
    Ok((input, report))
}

//! TMSim - Air-bone gap simulation for tympanic membrane perforations
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

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tmsim::cli::{Args, Command};
use tmsim::sweep::CancelToken;
use tmsim::validation::ValidationStatus;
use tmsim::{AbgModel, TmSimError, workflow};

fn print_single(run: &tmsim::simulator::SingleRun) {
    let s = &run.state;
    println!(
        "📊 Grade {} at ({:.2}, {:.2}), volume {:.2} cm³, area {:.1} mm² [{}]",
        s.grade, s.position_x, s.position_y, s.middle_ear_volume_cm3, s.tympanic_area_mm2, run.model
    );
    for p in &run.points {
        println!("  {:>6.0} Hz  {:>6.2} dB  {}", p.frequency_hz, p.abg_db, p.severity);
    }
    println!(
        "  - Low {:.2} dB | Mid {:.2} dB | High {:.2} dB | Total {:.2} dB",
        run.bands.low, run.bands.mid, run.bands.high, run.bands.total
    );
}

fn single(args: &Args, a: &tmsim::cli::SingleArgs, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let (run, path) = workflow::run_single(args.model.build(), a, out_dir)?;
    print_single(&run);
    if let Some(p) = path {
        println!("✅ Saved to {}", p.display());
    }
    Ok(())
}

fn sweep(args: &Args, a: &tmsim::cli::SweepArgs, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\n⚠️ Interrupt received, stopping after the current combination...");
        handler_token.cancel();
    })?;

    let total = workflow::sweep_config(a).total_combinations();
    println!("🚀 Running {} combinations with model '{}'", total, args.model.build().name());
    let out = workflow::run_sweep(args.model.build(), a, out_dir, cancel)?;

    if out.report.cancelled {
        println!("⚠️ {}", out.report.message);
    } else {
        println!("✅ {} in {:.2?}", out.report.message, out.report.elapsed);
    }
    println!("  - Full table:    {}", out.full_csv.display());
    println!("  - Summary table: {}", out.summary_csv.display());
    Ok(())
}

fn validate(args: &Args, a: &tmsim::cli::ValidateArgs) -> Result<(), Box<dyn Error>> {
    let out = match workflow::run_validation(args.model.build(), a) {
        Ok(out) => out,
        Err(e @ (TmSimError::ModelNotConfigured | TmSimError::EmptyDataset(_))) => {
            log::warn!("validation skipped: {}", e);
            println!("⚠️ Validation skipped: {}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let s = &out.summary;
    let icon = match s.validation_status {
        ValidationStatus::Excellent | ValidationStatus::Good => "✅",
        ValidationStatus::Acceptable => "⚠️",
        ValidationStatus::NeedsImprovement => "❌",
    };
    println!(
        "{} Validation of '{}': {} ({} patients, {} samples)",
        icon, s.model, s.validation_status, s.patients, s.samples
    );
    println!("  - Mean absolute error: {:.2} dB", s.mean_absolute_error);
    println!("  - Correlation:         {:.3}", s.correlation_coefficient);
    println!("📊 Grade comparison (clinical vs simulated, centred perforation):");
    for g in &out.grades {
        println!(
            "  Grade {} (n={}): clinical {:.1} dB, simulated {:.1} dB, difference {:+.1} dB",
            g.grade, g.patients, g.clinical_mean_db, g.simulated_mean_db, g.difference_db
        );
    }
    if let Some(p) = &a.json {
        println!("✅ Report saved to {}", p.display());
    }
    Ok(())
}

fn analyze(a: &tmsim::cli::AnalyzeArgs, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let (input, report) = workflow::run_analysis(a, out_dir)?;
    println!("📊 Analysis of {} ({} rows)", input.display(), report.rows);
    for s in &report.grade_stats {
        println!(
            "  Grade {}: {:.1} ± {:.1} dB over {} rows",
            s.grade, s.mean_db, s.std_db, s.samples
        );
    }
    for c in &report.comparisons {
        println!(
            "  Grade {}: clinical {:.1} dB | mean error {:+.1} dB | best ({:.2}, {:.2}) error {:+.1} dB",
            c.grade, c.clinical_db, c.mean_error_db, c.best.position_x, c.best.position_y, c.best_error_db
        );
    }
    for f in &report.best_position_frequency {
        println!("  Grade {}: frequency error at best position {:+.1} dB", f.grade, f.mean_error_db);
    }
    for (grade, range) in &report.position_effect {
        println!("  Grade {}: position effect range {:.1} dB", grade, range);
    }
    if let Some(p) = &report.patient_stats {
        println!(
            "📊 Patients: n={}, mean ABG {:.1} dB, std {:.1} dB, range {:.1} ~ {:.1} dB",
            p.patients, p.mean_db, p.std_db, p.min_db, p.max_db
        );
    }
    if let Some(g) = &report.groups {
        println!(
            "  Simulation (perforation only): {:.1} ± {:.1} dB over {} rows",
            g.simulated_mean_db, g.simulated_std_db, g.simulated_samples
        );
        for s in &g.groups {
            println!(
                "  {} (n={}): {:.1} ± {:.1} dB, {:+.1} dB vs simulation",
                s.group, s.abg.patients, s.abg.mean_db, s.abg.std_db, s.difference_db
            );
        }
    }
    if let Some(p) = &a.json {
        println!("✅ Report saved to {}", p.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    tmsim::cli::validate_args_or_exit(&args);

    let out_dir = workflow::output_dir(args.output_dir.as_deref())?;
    log::debug!("output directory: {}", out_dir.display());

    match &args.command {
        Command::Single(a) => single(&args, a, &out_dir),
        Command::Sweep(a) => sweep(&args, a, &out_dir),
        Command::Validate(a) => validate(&args, a),
        Command::Analyze(a) => analyze(a, &out_dir),
    }
}

//! CSV import and export of simulation tables
//!
//! Column names and order are fixed: downstream analysis scripts select
//! columns by these exact headers.

use crate::constants::NUM_FREQUENCIES;
use crate::error::{Result, TmSimError};
use crate::severity::Severity;
use crate::simulator::SingleRun;
use crate::state::PerforationGrade;
use crate::sweep::{ExperimentResult, GradeVolumeSummary};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// ABG column names, one per standard frequency
pub const ABG_COLUMNS: [&str; NUM_FREQUENCIES] = [
    "ABG_125Hz",
    "ABG_250Hz",
    "ABG_500Hz",
    "ABG_1000Hz",
    "ABG_2000Hz",
    "ABG_3000Hz",
    "ABG_4000Hz",
    "ABG_8000Hz",
];

const GEOMETRY_COLUMNS: [&str; 3] = ["TM_Diameter_mm", "Perforation_Diameter_mm", "Perforation_Area_mm2"];
const BAND_COLUMNS: [&str; 4] = ["AvgLow", "AvgMid", "AvgHigh", "AvgTotal"];

/// Header of the single-configuration export
pub const SINGLE_RUN_HEADER: [&str; 8] = [
    "Frequency_Hz",
    "ABG_dB",
    "Severity",
    "Grade",
    "PosX",
    "PosY",
    "MiddleEarVolume_cm3",
    "TympanicArea_mm2",
];

/// `Grade,PosX,PosY,Quadrant,MiddleEarVolume_cm3,<geometry>,<ABG_*>,<bands>`
pub fn full_sweep_header() -> Vec<&'static str> {
    let mut h = vec!["Grade", "PosX", "PosY", "Quadrant", "MiddleEarVolume_cm3"];
    h.extend(GEOMETRY_COLUMNS);
    h.extend(ABG_COLUMNS);
    h.extend(BAND_COLUMNS);
    h
}

/// Full sweep header without `PosX`, `PosY` and `Quadrant`
pub fn summary_header() -> Vec<&'static str> {
    let mut h = vec!["Grade", "MiddleEarVolume_cm3"];
    h.extend(GEOMETRY_COLUMNS);
    h.extend(ABG_COLUMNS);
    h.extend(BAND_COLUMNS);
    h
}

fn db(v: f64) -> String {
    format!("{:.2}", v)
}

fn mm(v: f64) -> String {
    format!("{:.3}", v)
}

fn push_abg_and_bands(row: &mut Vec<String>, abg: &[f64; NUM_FREQUENCIES], bands: [f64; 4]) {
    row.extend(abg.iter().copied().map(db));
    row.extend(bands.into_iter().map(db));
}

/// Write the full sweep table
pub fn write_full_sweep<W: io::Write>(writer: W, results: &[ExperimentResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(full_sweep_header())?;
    for r in results {
        let mut row = vec![
            r.grade.to_string(),
            format!("{:.4}", r.pos_x),
            format!("{:.4}", r.pos_y),
            r.quadrant.to_string(),
            format!("{:.2}", r.middle_ear_volume),
            mm(r.tm_diameter_mm),
            mm(r.perforation_diameter_mm),
            mm(r.perforation_area_mm2),
        ];
        push_abg_and_bands(&mut row, &r.abg_by_frequency, [r.avg_low, r.avg_mid, r.avg_high, r.avg_total]);
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the per (grade, volume) summary table
pub fn write_summary<W: io::Write>(writer: W, summary: &[GradeVolumeSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(summary_header())?;
    for s in summary {
        let mut row = vec![
            s.grade.to_string(),
            format!("{:.2}", s.middle_ear_volume),
            mm(s.tm_diameter_mm),
            mm(s.perforation_diameter_mm),
            mm(s.perforation_area_mm2),
        ];
        push_abg_and_bands(&mut row, &s.abg_by_frequency, [s.avg_low, s.avg_mid, s.avg_high, s.avg_total]);
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one frequency response followed by the `AVG_LOW`, `AVG_MID` and
/// `AVG_HIGH` trailer rows
pub fn write_single_run<W: io::Write>(writer: W, run: &SingleRun) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SINGLE_RUN_HEADER)?;
    let s = &run.state;
    for p in &run.points {
        wtr.write_record([
            format!("{:.0}", p.frequency_hz),
            db(p.abg_db),
            p.severity.label().to_string(),
            s.grade.to_string(),
            format!("{:.4}", s.position_x),
            format!("{:.4}", s.position_y),
            format!("{:.2}", s.middle_ear_volume_cm3),
            format!("{:.1}", s.tympanic_area_mm2),
        ])?;
    }
    for (label, value) in [
        ("AVG_LOW", run.bands.low),
        ("AVG_MID", run.bands.mid),
        ("AVG_HIGH", run.bands.high),
    ] {
        wtr.write_record([
            label.to_string(),
            db(value),
            Severity::from_abg(value).label().to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_full_sweep(path: &Path, results: &[ExperimentResult]) -> Result<()> {
    write_full_sweep(File::create(path)?, results)?;
    log::info!("wrote {} sweep rows to {}", results.len(), path.display());
    Ok(())
}

pub fn save_summary(path: &Path, summary: &[GradeVolumeSummary]) -> Result<()> {
    write_summary(File::create(path)?, summary)?;
    log::info!("wrote {} summary rows to {}", summary.len(), path.display());
    Ok(())
}

pub fn save_single_run(path: &Path, run: &SingleRun) -> Result<()> {
    write_single_run(File::create(path)?, run)?;
    log::info!("wrote single run to {}", path.display());
    Ok(())
}

struct Columns(HashMap<String, usize>);

impl Columns {
    fn index(&self, name: &str) -> Result<usize> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| TmSimError::MissingColumn(name.to_string()))
    }
}

fn field(record: &csv::StringRecord, idx: usize, name: &str, line: usize) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|e| TmSimError::Parse {
        line,
        message: format!("column {}: '{}' ({})", name, raw, e),
    })
}

/// Parse a full sweep table by header name; column order does not matter
pub fn read_full_sweep<R: io::Read>(reader: R) -> Result<Vec<ExperimentResult>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let columns = Columns(
        rdr.headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect(),
    );

    let header = full_sweep_header();
    let idx: Vec<usize> = header
        .iter()
        .map(|name| columns.index(name))
        .collect::<Result<_>>()?;

    let mut results = Vec::new();
    for (row_no, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row_no + 2;
        let v: Vec<f64> = header
            .iter()
            .zip(&idx)
            .map(|(name, &i)| field(&record, i, name, line))
            .collect::<Result<_>>()?;

        // offsets follow full_sweep_header()
        let abg: [f64; NUM_FREQUENCIES] = std::array::from_fn(|k| v[8 + k]);
        results.push(ExperimentResult {
            grade: PerforationGrade::new(v[0].round() as i64),
            pos_x: v[1],
            pos_y: v[2],
            quadrant: v[3].round().clamp(0.0, 4.0) as u8,
            middle_ear_volume: v[4],
            tm_diameter_mm: v[5],
            perforation_diameter_mm: v[6],
            perforation_area_mm2: v[7],
            abg_by_frequency: abg,
            avg_low: v[16],
            avg_mid: v[17],
            avg_high: v[18],
            avg_total: v[19],
        });
    }
    Ok(results)
}

pub fn read_full_sweep_csv(path: &Path) -> Result<Vec<ExperimentResult>> {
    let results = read_full_sweep(File::open(path)?)?;
    log::info!("read {} sweep rows from {}", results.len(), path.display());
    Ok(results)
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.csv` for the given time
pub fn timestamped_filename_at(prefix: &str, at: &chrono::NaiveDateTime) -> String {
    format!("{}_{}.csv", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.csv` for the current local time
pub fn timestamped_filename(prefix: &str) -> String {
    timestamped_filename_at(prefix, &chrono::Local::now().naive_local())
}

/// Most recently modified `<prefix>_*.csv` in `dir`
pub fn find_latest(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let wanted = format!("{}_", prefix);
    let mut best: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&wanted) && n.ends_with(".csv"));
        if !matches {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if best.as_ref().is_none_or(|(t, _)| modified > *t) {
            best = Some((modified, path));
        }
    }
    best.map(|(_, p)| p).ok_or_else(|| TmSimError::NoInputFile {
        prefix: prefix.to_string(),
        dir: dir.to_path_buf(),
    })
}

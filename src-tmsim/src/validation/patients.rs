//! Patient ABG records and the built-in clinical reference set

use crate::error::{Result, TmSimError};
use crate::state::PerforationGrade;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Frequencies (Hz) measured in the clinical reference set
pub const CLINICAL_FREQUENCIES: [u32; 6] = [250, 500, 1000, 2000, 3000, 4000];

/// Side of the measured ear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ear {
    Left,
    Right,
}

impl Ear {
    pub fn label(self) -> &'static str {
        match self {
            Ear::Left => "L",
            Ear::Right => "R",
        }
    }
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Ear {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "lt" | "left" => Ok(Ear::Left),
            "r" | "rt" | "right" => Ok(Ear::Right),
            other => Err(format!("unknown ear side '{}' (expected L or R)", other)),
        }
    }
}

/// Surgical group of the reference set (intact canal wall)
pub const ICW_GROUP: &str = "ICW";

/// Pre-operative ABG of one ear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub grade: PerforationGrade,
    pub ear: Ear,
    /// Surgical group label such as `ICW` or `CWD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Frequency (Hz) → measured ABG (dB), finite values only
    pub abg_by_frequency: BTreeMap<u32, f64>,
}

impl PatientRecord {
    pub fn new(id: impl Into<String>, grade: i64, ear: Ear, abg_by_frequency: BTreeMap<u32, f64>) -> Self {
        Self {
            id: id.into(),
            grade: PerforationGrade::new(grade),
            ear,
            group: None,
            abg_by_frequency,
        }
    }

    /// Tag the record with a surgical group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Record over [`CLINICAL_FREQUENCIES`] from six ABG values
    pub fn clinical(id: &str, grade: i64, ear: Ear, abg: [f64; 6]) -> Self {
        let map = CLINICAL_FREQUENCIES.iter().copied().zip(abg).collect();
        Self::new(id, grade, ear, map)
    }

    /// ABG = air − bone at every frequency present in both audiograms
    ///
    /// Frequencies where either threshold is not a finite number are skipped.
    pub fn from_thresholds(
        id: impl Into<String>,
        grade: i64,
        ear: Ear,
        air: &BTreeMap<u32, f64>,
        bone: &BTreeMap<u32, f64>,
    ) -> Self {
        let id = id.into();
        let abg = air
            .iter()
            .filter_map(|(f, a)| bone.get(f).map(|b| (*f, a - b)))
            .filter(|(f, v)| {
                if !v.is_finite() {
                    log::warn!("patient '{}': no usable threshold pair at {} Hz, skipped", id, f);
                }
                v.is_finite()
            })
            .collect();
        Self::new(id, grade, ear, abg)
    }

    pub fn len(&self) -> usize {
        self.abg_by_frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abg_by_frequency.is_empty()
    }

    /// Mean measured ABG over every frequency
    pub fn average_abg(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.abg_by_frequency.values().sum::<f64>() / self.len() as f64
    }
}

/// Built-in reference set of eight ICW ears
///
/// Only the per-grade mean curves and the number of ears per grade are
/// clinical data. The individual audiograms are synthetic: they were chosen
/// so that their per-grade means reproduce those curves exactly, and the ids
/// `ICW1`..`ICW8` do not identify measured patients.
pub fn clinical_dataset() -> Vec<PatientRecord> {
    let records = vec![
        PatientRecord::clinical("ICW5", 1, Ear::Right, [35.0, 5.0, 10.0, 0.0, 0.0, 10.0]),
        PatientRecord::clinical("ICW1", 2, Ear::Right, [20.0, 15.0, 20.0, 5.0, 25.0, 25.0]),
        PatientRecord::clinical("ICW2", 2, Ear::Left, [25.0, 25.0, 20.0, 10.0, 30.0, 30.0]),
        PatientRecord::clinical("ICW3", 2, Ear::Right, [20.0, 20.0, 15.0, 5.0, 25.0, 30.0]),
        PatientRecord::clinical("ICW7", 2, Ear::Left, [25.0, 20.0, 25.0, 10.0, 30.0, 25.0]),
        PatientRecord::clinical("ICW4", 3, Ear::Left, [60.0, 35.0, 35.0, 15.0, 30.0, 20.0]),
        PatientRecord::clinical("ICW6", 4, Ear::Right, [35.0, 5.0, 15.0, 5.0, 20.0, 35.0]),
        PatientRecord::clinical("ICW8", 4, Ear::Left, [25.0, 5.0, 15.0, 5.0, 30.0, 35.0]),
    ];
    records.into_iter().map(|p| p.with_group(ICW_GROUP)).collect()
}

#[derive(Debug, Deserialize)]
struct PatientRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Grade")]
    grade: i64,
    #[serde(rename = "Ear")]
    ear: String,
    #[serde(rename = "Frequency_Hz")]
    frequency_hz: u32,
    #[serde(rename = "ABG_dB")]
    abg_db: f64,
    #[serde(rename = "Group", default)]
    group: Option<String>,
}

/// Read patients from a long-format CSV (`Id,Grade,Ear,Frequency_Hz,ABG_dB`)
///
/// Rows sharing an id are merged into one record, in first-seen order. An
/// optional `Group` column sets the surgical group. Rows whose ABG is not a
/// finite number (`nan`, `inf`) are skipped with a warning.
pub fn load_patients_csv(path: &Path) -> Result<Vec<PatientRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut records: Vec<PatientRecord> = Vec::new();

    for (i, row) in reader.deserialize::<PatientRow>().enumerate() {
        let row = row?;
        // header is line 1
        let line = i + 2;
        let ear: Ear = row
            .ear
            .parse()
            .map_err(|message| TmSimError::Parse { line, message })?;
        if !row.abg_db.is_finite() {
            log::warn!(
                "{} line {}: ABG '{}' for patient '{}' at {} Hz is not a number, skipped",
                path.display(),
                line,
                row.abg_db,
                row.id,
                row.frequency_hz
            );
            continue;
        }
        let group = row.group.filter(|g| !g.is_empty());

        match records.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => {
                if existing.grade != PerforationGrade::new(row.grade)
                    || existing.ear != ear
                    || (group.is_some() && existing.group.is_some() && existing.group != group)
                {
                    return Err(TmSimError::Parse {
                        line,
                        message: format!("patient '{}' changes grade, ear or group between rows", row.id),
                    });
                }
                if existing.group.is_none() {
                    existing.group = group;
                }
                existing.abg_by_frequency.insert(row.frequency_hz, row.abg_db);
            }
            None => {
                let mut map = BTreeMap::new();
                map.insert(row.frequency_hz, row.abg_db);
                let mut record = PatientRecord::new(row.id, row.grade, ear, map);
                record.group = group;
                records.push(record);
            }
        }
    }

    log::info!("loaded {} patients from {}", records.len(), path.display());
    Ok(records)
}

/// Write patients in the long format read by [`load_patients_csv`]
pub fn save_patients_csv(patients: &[PatientRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Id", "Grade", "Ear", "Frequency_Hz", "ABG_dB", "Group"])?;
    for p in patients {
        for (f, abg) in &p.abg_by_frequency {
            writer.write_record([
                p.id.clone(),
                p.grade.to_string(),
                p.ear.label().to_string(),
                f.to_string(),
                format!("{:.2}", abg),
                p.group.clone().unwrap_or_default(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn dataset_grade_means_match_clinical_curves() {
        let patients = clinical_dataset();
        assert_eq!(patients.len(), 8);
        let mean_of = |g: u8| {
            let values: Vec<f64> = patients
                .iter()
                .filter(|p| p.grade.value() == g)
                .flat_map(|p| p.abg_by_frequency.values().copied())
                .collect();
            values.iter().sum::<f64>() / values.len() as f64
        };
        assert!((mean_of(1) - 10.0).abs() < 0.05);
        assert!((mean_of(2) - 20.8).abs() < 0.05);
        assert!((mean_of(3) - 32.5).abs() < 0.05);
        assert!((mean_of(4) - 19.2).abs() < 0.05);
    }

    #[test]
    fn thresholds_give_air_minus_bone() {
        let air: BTreeMap<u32, f64> = [(500, 40.0), (1000, 35.0), (2000, 30.0)].into_iter().collect();
        let bone: BTreeMap<u32, f64> = [(500, 10.0), (1000, 15.0), (4000, 5.0)].into_iter().collect();
        let p = PatientRecord::from_thresholds("P1", 2, Ear::Left, &air, &bone);
        assert_eq!(p.len(), 2);
        assert_eq!(p.abg_by_frequency[&500], 30.0);
        assert_eq!(p.abg_by_frequency[&1000], 20.0);
        assert_eq!(p.average_abg(), 25.0);
    }

    #[test]
    fn thresholds_skip_non_finite_values() {
        let air: BTreeMap<u32, f64> = [(500, 40.0), (1000, f64::NAN), (2000, 30.0)].into_iter().collect();
        let bone: BTreeMap<u32, f64> = [(500, 10.0), (1000, 15.0), (2000, f64::INFINITY)].into_iter().collect();
        let p = PatientRecord::from_thresholds("P2", 1, Ear::Right, &air, &bone);
        assert_eq!(p.len(), 1);
        assert_eq!(p.abg_by_frequency[&500], 30.0);
    }

    #[test]
    fn csv_nan_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nan.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Id,Grade,Ear,Frequency_Hz,ABG_dB").unwrap();
        writeln!(f, "A,2,L,250,20").unwrap();
        writeln!(f, "A,2,L,500,15").unwrap();
        writeln!(f, "A,2,L,1000,nan").unwrap();
        writeln!(f, "A,2,L,2000,5").unwrap();
        writeln!(f, "B,3,R,1000,NaN").unwrap();
        writeln!(f, "B,3,R,4000,30").unwrap();
        drop(f);
        let loaded = load_patients_csv(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].abg_by_frequency.keys().copied().collect::<Vec<_>>(), vec![250, 500, 2000]);
        assert_eq!(loaded[1].len(), 1);
        assert!(loaded.iter().flat_map(|p| p.abg_by_frequency.values()).all(|v| v.is_finite()));
        assert_eq!(loaded[0].group, None);
    }

    #[test]
    fn csv_group_column_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Id,Grade,Ear,Frequency_Hz,ABG_dB,Group").unwrap();
        writeln!(f, "C1,2,L,500,40,CWD").unwrap();
        writeln!(f, "C1,2,L,1000,35,").unwrap();
        writeln!(f, "I1,1,R,500,10,").unwrap();
        writeln!(f, "X1,1,R,500,10,ICW").unwrap();
        writeln!(f, "X1,1,R,1000,10,CWD").unwrap();
        drop(f);
        match load_patients_csv(&path) {
            Err(TmSimError::Parse { line, .. }) => assert_eq!(line, 6),
            other => panic!("unexpected {:?}", other),
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let trimmed: Vec<&str> = text.lines().take(4).collect();
        std::fs::write(&path, trimmed.join("\n")).unwrap();
        let loaded = load_patients_csv(&path).unwrap();
        assert_eq!(loaded[0].group.as_deref(), Some("CWD"));
        assert_eq!(loaded[0].len(), 2);
        assert_eq!(loaded[1].group, None);
    }

    #[test]
    fn builtin_dataset_is_icw() {
        assert!(clinical_dataset().iter().all(|p| p.group.as_deref() == Some(ICW_GROUP)));
    }

    #[test]
    fn ear_parsing() {
        assert_eq!("Lt".parse::<Ear>().unwrap(), Ear::Left);
        assert_eq!(" right ".parse::<Ear>().unwrap(), Ear::Right);
        assert!("both".parse::<Ear>().is_err());
    }

    #[test]
    fn csv_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.csv");
        let patients = clinical_dataset();
        save_patients_csv(&patients, &path).unwrap();
        let loaded = load_patients_csv(&path).unwrap();
        assert_eq!(loaded, patients);
    }

    #[test]
    fn csv_bad_ear_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Id,Grade,Ear,Frequency_Hz,ABG_dB").unwrap();
        writeln!(f, "A,1,L,500,10").unwrap();
        writeln!(f, "B,2,X,500,20").unwrap();
        drop(f);
        match load_patients_csv(&path) {
            Err(TmSimError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}

//! Literature and empirical reference tables
//!
//! Both tables are grade × standard-frequency matrices of ABG in dB, looked up
//! with the same nearest-frequency rule.

use crate::constants::{NUM_FREQUENCIES, NUM_GRADES, STANDARD_FREQUENCIES};
use crate::state::PerforationGrade;

/// Immutable grade × frequency table of dB values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeFrequencyTable {
    values: [[f64; NUM_FREQUENCIES]; NUM_GRADES],
}

impl GradeFrequencyTable {
    pub const fn new(values: [[f64; NUM_FREQUENCIES]; NUM_GRADES]) -> Self {
        Self { values }
    }

    /// Value for a grade at the standard frequency closest to `frequency`
    pub fn lookup(&self, grade: PerforationGrade, frequency: f64) -> f64 {
        self.values[grade.index()][nearest_freq_index(frequency)]
    }

    /// Full row of a grade
    pub fn row(&self, grade: PerforationGrade) -> &[f64; NUM_FREQUENCIES] {
        &self.values[grade.index()]
    }
}

/// Published mean ABG per perforation grade
pub const LITERATURE_ABG_TABLE: GradeFrequencyTable = GradeFrequencyTable::new([
    // 125   250   500   1k    2k    3k    4k    8k
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [15.0, 14.0, 12.0, 10.0, 8.0, 9.0, 10.0, 12.0],
    [25.0, 23.0, 20.0, 16.0, 13.0, 14.0, 16.0, 18.0],
    [35.0, 33.0, 29.0, 24.0, 19.0, 20.0, 23.0, 26.0],
    [42.0, 40.0, 35.0, 29.0, 24.0, 25.0, 28.0, 32.0],
]);

/// Correction blended into the transmission model
pub const EMPIRICAL_CORRECTION_TABLE: GradeFrequencyTable = GradeFrequencyTable::new([
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [12.0, 11.0, 10.0, 8.0, 7.0, 8.0, 9.0, 11.0],
    [22.0, 20.0, 18.0, 15.0, 12.0, 13.0, 15.0, 17.0],
    [32.0, 30.0, 27.0, 22.0, 18.0, 19.0, 22.0, 25.0],
    [38.0, 36.0, 32.0, 27.0, 22.0, 23.0, 26.0, 29.0],
]);

/// Index of the standard frequency closest to `frequency`
///
/// Left-to-right scan with strict `<`: on an exact midpoint the lower
/// frequency wins. NaN maps to index 0.
pub fn nearest_freq_index(frequency: f64) -> usize {
    let mut best = 0;
    let mut best_diff = (frequency - STANDARD_FREQUENCIES[0]).abs();
    for (i, &f) in STANDARD_FREQUENCIES.iter().enumerate().skip(1) {
        let diff = (frequency - f).abs();
        if diff < best_diff {
            best_diff = diff;
            best = i;
        }
    }
    best
}

/// Literature ABG for a grade at the nearest standard frequency
pub fn literature_abg(grade: PerforationGrade, frequency: f64) -> f64 {
    LITERATURE_ABG_TABLE.lookup(grade, frequency)
}

/// Empirical correction for a grade at the nearest standard frequency
pub fn empirical_correction(grade: PerforationGrade, frequency: f64) -> f64 {
    EMPIRICAL_CORRECTION_TABLE.lookup(grade, frequency)
}

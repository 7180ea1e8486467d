//! Perforation state types
//!
//! Everything here is a plain value: the model recomputes from these on every
//! call and nothing holds a reference back into shared state.

use crate::constants::{
    DEFAULT_TYMPANIC_AREA_MM2, MAX_GRADE, NORMAL_MIDDLE_EAR_VOLUME_CM3, NUM_GRADES,
    PRIMARY_GRADE_RATIO, VISUALIZATION_GRADE_RATIO,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Perforation grade, always within `0..=4`
///
/// Construction clamps, so every table lookup indexed by a grade is in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct PerforationGrade(u8);

impl PerforationGrade {
    /// Intact membrane
    pub const INTACT: Self = Self(0);

    /// Build a grade from any integer, clamping to `0..=4`
    pub fn new(grade: i64) -> Self {
        let clamped = grade.clamp(0, MAX_GRADE as i64);
        if clamped != grade {
            log::warn!("perforation grade {} out of range, clamped to {}", grade, clamped);
        }
        Self(clamped as u8)
    }

    /// Nearest grade for a perforated area ratio (`round(ratio * 4)`)
    ///
    /// Halves round away from zero, so every primary ratio maps back to its
    /// own grade (0.125 → 1, 0.375 → 2, 0.625 → 3, 0.875 → 4).
    pub fn from_ratio(ratio: f64) -> Self {
        let g = (ratio * MAX_GRADE as f64).round();
        if g.is_nan() {
            return Self::INTACT;
        }
        Self(g.clamp(0.0, MAX_GRADE as f64) as u8)
    }

    /// Numeric grade
    pub fn value(self) -> u8 {
        self.0
    }

    /// Row index into grade × frequency tables
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_intact(self) -> bool {
        self.0 == 0
    }

    /// Perforated area ratio used by the ABG model
    pub fn primary_ratio(self) -> f64 {
        PRIMARY_GRADE_RATIO[self.index()]
    }

    /// Perforated area ratio used for reported sweep geometry
    pub fn visualization_ratio(self) -> f64 {
        VISUALIZATION_GRADE_RATIO[self.index()]
    }

    /// All grades from intact to subtotal
    pub fn all() -> impl Iterator<Item = Self> {
        (0..NUM_GRADES as u8).map(Self)
    }

    /// Perforated grades only (1..=4)
    pub fn perforated() -> impl Iterator<Item = Self> {
        (1..NUM_GRADES as u8).map(Self)
    }
}

impl From<i64> for PerforationGrade {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<PerforationGrade> for u8 {
    fn from(value: PerforationGrade) -> Self {
        value.0
    }
}

impl fmt::Display for PerforationGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full description of one perforated ear
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerforationState {
    pub grade: PerforationGrade,
    /// Anterior (0) → posterior (1)
    pub position_x: f64,
    /// Inferior (0) → superior (1)
    pub position_y: f64,
    pub middle_ear_volume_cm3: f64,
    pub tympanic_area_mm2: f64,
}

impl Default for PerforationState {
    fn default() -> Self {
        Self {
            grade: PerforationGrade::INTACT,
            position_x: 0.5,
            position_y: 0.5,
            middle_ear_volume_cm3: NORMAL_MIDDLE_EAR_VOLUME_CM3,
            tympanic_area_mm2: DEFAULT_TYMPANIC_AREA_MM2,
        }
    }
}

impl PerforationState {
    /// Build a state, clamping positions to `[0, 1]`
    pub fn new(
        grade: PerforationGrade,
        position_x: f64,
        position_y: f64,
        middle_ear_volume_cm3: f64,
        tympanic_area_mm2: f64,
    ) -> Self {
        Self {
            grade,
            position_x: clamp_unit(position_x),
            position_y: clamp_unit(position_y),
            middle_ear_volume_cm3,
            tympanic_area_mm2,
        }
    }

    /// Perforation at the centre of the membrane
    pub fn centered(grade: PerforationGrade, middle_ear_volume_cm3: f64, tympanic_area_mm2: f64) -> Self {
        Self::new(grade, 0.5, 0.5, middle_ear_volume_cm3, tympanic_area_mm2)
    }

    /// Perforated area ratio from the primary table
    pub fn ratio(&self) -> f64 {
        self.grade.primary_ratio()
    }

    /// Perforated area (mm²) according to the primary table
    pub fn perforation_area_mm2(&self) -> f64 {
        self.ratio() * self.tympanic_area_mm2
    }
}

/// One frequency query against a perforation state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResponseRequest {
    pub frequency: f64,
    pub state: PerforationState,
}

impl FrequencyResponseRequest {
    pub fn new(frequency: f64, state: PerforationState) -> Self {
        Self { frequency, state }
    }
}

pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) }
}

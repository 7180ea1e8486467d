//! Validation outcome types

use super::patients::Ear;
use crate::state::PerforationGrade;
use serde::Serialize;
use std::fmt;

/// Quality of the model against patient data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Excellent,
    Good,
    Acceptable,
    NeedsImprovement,
}

impl ValidationStatus {
    /// Classify with strict bounds: `MAE < 10 && r > 0.7` is excellent,
    /// `< 15 / > 0.5` good, `< 20 / > 0.3` acceptable
    pub fn classify(mean_absolute_error: f64, correlation: f64) -> Self {
        if mean_absolute_error < 10.0 && correlation > 0.7 {
            ValidationStatus::Excellent
        } else if mean_absolute_error < 15.0 && correlation > 0.5 {
            ValidationStatus::Good
        } else if mean_absolute_error < 20.0 && correlation > 0.3 {
            ValidationStatus::Acceptable
        } else {
            ValidationStatus::NeedsImprovement
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ValidationStatus::Excellent => "EXCELLENT",
            ValidationStatus::Good => "GOOD",
            ValidationStatus::Acceptable => "ACCEPTABLE",
            ValidationStatus::NeedsImprovement => "NEEDS_IMPROVEMENT",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Simulated versus measured values for one patient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientResult {
    pub id: String,
    pub grade: PerforationGrade,
    pub ear: Ear,
    pub frequencies_hz: Vec<u32>,
    pub simulated_db: Vec<f64>,
    pub measured_db: Vec<f64>,
    pub mean_absolute_error: f64,
}

/// Result of one validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub model: String,
    pub patients: usize,
    pub samples: usize,
    pub mean_absolute_error: f64,
    pub correlation_coefficient: f64,
    pub validation_status: ValidationStatus,
    pub per_patient: Vec<PatientResult>,
}

/// Clinical and simulated mean at one frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyComparison {
    pub frequency_hz: u32,
    pub clinical_db: f64,
    pub simulated_db: f64,
    /// simulated − clinical
    pub error_db: f64,
}

/// Grade-level comparison of mean measured and mean simulated ABG
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeComparison {
    pub grade: PerforationGrade,
    pub patients: usize,
    pub clinical_mean_db: f64,
    pub simulated_mean_db: f64,
    /// simulated − clinical
    pub difference_db: f64,
    pub per_frequency: Vec<FrequencyComparison>,
}

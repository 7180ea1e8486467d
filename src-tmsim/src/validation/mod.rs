//! Model validation against recorded patient audiograms
//!
//! Patient position is unknown in the clinical records, so every patient is
//! simulated with a centred perforation of the recorded grade.

pub mod patients;
pub mod report;
pub mod stats;

pub use patients::{
    CLINICAL_FREQUENCIES, Ear, ICW_GROUP, PatientRecord, clinical_dataset, load_patients_csv, save_patients_csv,
};
pub use report::{FrequencyComparison, GradeComparison, PatientResult, ValidationStatus, ValidationSummary};
pub use stats::{mean, mean_absolute_error, pearson_correlation, population_std_dev, std_dev};

use crate::constants::{DEFAULT_TYMPANIC_AREA_MM2, NORMAL_MIDDLE_EAR_VOLUME_CM3};
use crate::error::{Result, TmSimError};
use crate::model::AbgModel;
use crate::state::{PerforationGrade, PerforationState};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Runs a model against a list of patient records
#[derive(Clone)]
pub struct PatientValidator {
    model: Option<Arc<dyn AbgModel>>,
    patients: Vec<PatientRecord>,
    middle_ear_volume_cm3: f64,
    tympanic_area_mm2: f64,
}

impl fmt::Debug for PatientValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatientValidator")
            .field("model", &self.model.as_ref().map(|m| m.name()))
            .field("patients", &self.patients.len())
            .field("middle_ear_volume_cm3", &self.middle_ear_volume_cm3)
            .field("tympanic_area_mm2", &self.tympanic_area_mm2)
            .finish()
    }
}

impl PatientValidator {
    /// Validator over `patients`, with no model attached yet
    pub fn new(patients: Vec<PatientRecord>) -> Self {
        Self {
            model: None,
            patients,
            middle_ear_volume_cm3: NORMAL_MIDDLE_EAR_VOLUME_CM3,
            tympanic_area_mm2: DEFAULT_TYMPANIC_AREA_MM2,
        }
    }

    /// Validator over the built-in clinical reference set
    pub fn with_builtin_dataset() -> Self {
        Self::new(clinical_dataset())
    }

    pub fn with_model(mut self, model: Arc<dyn AbgModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn set_model(&mut self, model: Arc<dyn AbgModel>) {
        self.model = Some(model);
    }

    pub fn with_middle_ear_volume(mut self, volume_cm3: f64) -> Self {
        self.middle_ear_volume_cm3 = volume_cm3;
        self
    }

    pub fn with_tympanic_area(mut self, area_mm2: f64) -> Self {
        self.tympanic_area_mm2 = area_mm2;
        self
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    fn model(&self) -> Result<&Arc<dyn AbgModel>> {
        self.model.as_ref().ok_or(TmSimError::ModelNotConfigured)
    }

    fn centred_state(&self, grade: PerforationGrade) -> PerforationState {
        PerforationState::centered(grade, self.middle_ear_volume_cm3, self.tympanic_area_mm2)
    }

    /// Simulate every recorded measurement and score the model
    pub fn run_validation(&self) -> Result<ValidationSummary> {
        let model = self.model()?;

        let mut all_sim = Vec::new();
        let mut all_real = Vec::new();
        let mut per_patient = Vec::with_capacity(self.patients.len());

        for patient in &self.patients {
            let state = self.centred_state(patient.grade);
            let frequencies: Vec<u32> = patient.abg_by_frequency.keys().copied().collect();
            let measured: Vec<f64> = patient.abg_by_frequency.values().copied().collect();
            let simulated: Vec<f64> = frequencies
                .iter()
                .map(|&f| model.compute_abg(&state, f as f64))
                .collect();
            let mae = mean_absolute_error(&simulated, &measured);
            log::debug!(
                "patient {} ({}, grade {}): MAE {:.2} dB over {} frequencies",
                patient.id,
                patient.ear,
                patient.grade,
                mae,
                frequencies.len()
            );

            all_sim.extend_from_slice(&simulated);
            all_real.extend_from_slice(&measured);
            per_patient.push(PatientResult {
                id: patient.id.clone(),
                grade: patient.grade,
                ear: patient.ear,
                frequencies_hz: frequencies,
                simulated_db: simulated,
                measured_db: measured,
                mean_absolute_error: mae,
            });
        }

        if all_sim.is_empty() {
            return Err(TmSimError::EmptyDataset("no patient measurements to validate against".into()));
        }

        let mae = mean_absolute_error(&all_sim, &all_real);
        let corr = pearson_correlation(&all_sim, &all_real);
        let status = ValidationStatus::classify(mae, corr);
        log::info!(
            "validation of '{}' over {} patients / {} samples: MAE {:.2} dB, r = {:.3} → {}",
            model.name(),
            self.patients.len(),
            all_sim.len(),
            mae,
            corr,
            status
        );

        Ok(ValidationSummary {
            model: model.name().to_string(),
            patients: self.patients.len(),
            samples: all_sim.len(),
            mean_absolute_error: mae,
            correlation_coefficient: corr,
            validation_status: status,
            per_patient,
        })
    }

    /// Compare mean measured and mean simulated ABG per grade, ascending
    pub fn compare_by_grade(&self) -> Result<Vec<GradeComparison>> {
        let model = self.model()?;

        let mut by_grade: BTreeMap<PerforationGrade, Vec<&PatientRecord>> = BTreeMap::new();
        for p in &self.patients {
            by_grade.entry(p.grade).or_default().push(p);
        }

        let comparisons = by_grade
            .into_iter()
            .filter_map(|(grade, group)| {
                let state = self.centred_state(grade);

                let mut measured_at: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
                for p in &group {
                    for (&f, &abg) in &p.abg_by_frequency {
                        measured_at.entry(f).or_default().push(abg);
                    }
                }
                if measured_at.is_empty() {
                    return None;
                }

                let mut all_real = Vec::new();
                let mut all_sim = Vec::new();
                let per_frequency: Vec<FrequencyComparison> = measured_at
                    .iter()
                    .map(|(&f, values)| {
                        let sim = model.compute_abg(&state, f as f64);
                        all_real.extend_from_slice(values);
                        all_sim.extend(std::iter::repeat_n(sim, values.len()));
                        let clinical = mean(values);
                        FrequencyComparison {
                            frequency_hz: f,
                            clinical_db: clinical,
                            simulated_db: sim,
                            error_db: sim - clinical,
                        }
                    })
                    .collect();

                let clinical_mean = mean(&all_real);
                let simulated_mean = mean(&all_sim);
                Some(GradeComparison {
                    grade,
                    patients: group.len(),
                    clinical_mean_db: clinical_mean,
                    simulated_mean_db: simulated_mean,
                    difference_db: simulated_mean - clinical_mean,
                    per_frequency,
                })
            })
            .collect();
        Ok(comparisons)
    }
}

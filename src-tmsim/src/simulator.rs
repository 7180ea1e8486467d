//! Stateful simulator facade for interactive consumers
//!
//! A UI or visualisation layer owns one `EarSimulator`, adjusts it through the
//! setters and reads back ABG values. The simulator owns its configuration; the
//! model itself stays pure.

use crate::constants::{NUM_FREQUENCIES, STANDARD_FREQUENCIES};
use crate::model::{AbgModel, BandAverages, EarModel};
use crate::severity::Severity;
use crate::state::{PerforationGrade, PerforationState, clamp_unit};
use serde::Serialize;

/// One line of a single-configuration frequency response
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyPoint {
    pub frequency_hz: f64,
    pub abg_db: f64,
    pub severity: Severity,
}

/// Frequency response of one configuration, ready for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleRun {
    pub model: &'static str,
    pub state: PerforationState,
    pub points: Vec<FrequencyPoint>,
    pub bands: BandAverages,
}

/// Simulator holding a perforation state and a model
#[derive(Debug, Clone)]
pub struct EarSimulator<M: AbgModel = EarModel> {
    state: PerforationState,
    model: M,
}

impl Default for EarSimulator<EarModel> {
    fn default() -> Self {
        Self::new(EarModel)
    }
}

impl<M: AbgModel> EarSimulator<M> {
    pub fn new(model: M) -> Self {
        Self { state: PerforationState::default(), model }
    }

    pub fn with_state(mut self, state: PerforationState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &PerforationState {
        &self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Set the grade; values outside `0..=4` are clamped
    pub fn set_perforation_grade(&mut self, grade: i64) {
        self.state.grade = PerforationGrade::new(grade);
    }

    /// Set the perforation centre; coordinates are clamped to `[0, 1]`
    pub fn set_perforation_position(&mut self, x: f64, y: f64) {
        self.state.position_x = clamp_unit(x);
        self.state.position_y = clamp_unit(y);
    }

    pub fn set_middle_ear_volume(&mut self, volume_cm3: f64) {
        self.state.middle_ear_volume_cm3 = volume_cm3;
    }

    pub fn set_tympanic_area(&mut self, area_mm2: f64) {
        self.state.tympanic_area_mm2 = area_mm2;
    }

    /// ABG at one frequency for the current state
    pub fn compute_abg(&self, frequency: f64) -> f64 {
        self.model.compute_abg(&self.state, frequency)
    }

    /// ABG at the eight standard frequencies
    pub fn get_all_abg(&self) -> [f64; NUM_FREQUENCIES] {
        self.model.compute_all(&self.state)
    }

    /// Severity band of an ABG value
    pub fn get_severity_level(abg_db: f64) -> Severity {
        Severity::from_abg(abg_db)
    }

    /// Complete frequency response of the current state
    pub fn single_run(&self) -> SingleRun {
        let abg = self.get_all_abg();
        let points = STANDARD_FREQUENCIES
            .iter()
            .zip(abg.iter())
            .map(|(&frequency_hz, &abg_db)| FrequencyPoint {
                frequency_hz,
                abg_db,
                severity: Severity::from_abg(abg_db),
            })
            .collect();
        SingleRun {
            model: self.model.name(),
            state: self.state,
            points,
            bands: BandAverages::from_abg(&abg),
        }
    }
}

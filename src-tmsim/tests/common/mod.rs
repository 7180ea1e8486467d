//! Shared helpers for tmsim integration tests

#![allow(dead_code)]

use std::sync::Arc;
use tmsim::sweep::{SweepConfig, SweepReport, SweepRunner};
use tmsim::{AbgModel, EarModel, PerforationGrade, PerforationState, TransmissionModel};

/// Both shipped models, as injected handles
pub fn all_models() -> Vec<Arc<dyn AbgModel>> {
    vec![Arc::new(EarModel), Arc::new(TransmissionModel::default())]
}

/// Log-spaced frequencies covering 20 Hz .. 20 kHz
pub fn audible_frequencies(per_octave: usize) -> Vec<f64> {
    let octaves = (20000.0_f64 / 20.0).log2();
    let n = (octaves * per_octave as f64).ceil() as usize;
    (0..=n)
        .map(|i| (20.0 * 2f64.powf(i as f64 / per_octave as f64)).min(20000.0))
        .collect()
}

pub fn state(grade: i64, x: f64, y: f64, volume: f64) -> PerforationState {
    PerforationState::new(PerforationGrade::new(grade), x, y, volume, 85.0)
}

pub fn default_sweep(model: Arc<dyn AbgModel>) -> SweepReport {
    SweepRunner::new(model, SweepConfig::default())
        .expect("default sweep config is valid")
        .run()
}

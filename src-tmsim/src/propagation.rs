//! Leakage and transmission-efficiency ABG formulation
//!
//! An alternate model to [`crate::model::EarModel`]: the loss is split into sound
//! leaking through the perforation (scaled by hole size over wavelength) and the
//! drop in membrane transmission efficiency, then blended 60/40 with the
//! empirical correction table.

use crate::constants::{MAX_ABG_DB, REFERENCE_PRESSURE_PA, SPEED_OF_SOUND};
use crate::literature;
use crate::model::AbgModel;
use crate::state::{PerforationGrade, PerforationState};

/// Parameters of the transmission model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionModel {
    /// Speed of sound (m/s)
    pub speed_of_sound: f64,
    /// Fraction of leaked energy that escapes at low frequency
    pub low_freq_leak_factor: f64,
    /// Centre of the middle-ear resonance (Hz)
    pub resonance_hz: f64,
    /// Quality factor of the middle-ear resonance
    pub resonance_q: f64,
    /// Efficiency of an intact membrane
    pub base_efficiency: f64,
}

impl Default for TransmissionModel {
    fn default() -> Self {
        Self {
            speed_of_sound: SPEED_OF_SOUND,
            low_freq_leak_factor: 0.3,
            resonance_hz: 1000.0,
            resonance_q: 2.0,
            base_efficiency: 0.85,
        }
    }
}

impl TransmissionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leakage coefficient from the ratio hole size / wavelength
    pub fn leakage_coefficient(hole_to_wavelength: f64) -> f64 {
        let r = hole_to_wavelength;
        if r < 0.1 {
            1.0 - (r / 0.1).powi(2) * 0.5
        } else if r < 1.0 {
            0.5 * (1.0 - r)
        } else {
            0.1 / r
        }
    }

    /// Loss (dB) from sound escaping through the perforation, in `[0, 30]`
    pub fn leakage_loss(&self, ratio: f64, perforation_area_mm2: f64, frequency: f64) -> f64 {
        let wavelength = self.speed_of_sound / frequency.max(1.0);
        let hole_size_m = perforation_area_mm2.max(0.0).sqrt() / 1000.0;
        let coeff = Self::leakage_coefficient(hole_size_m / wavelength);
        let remaining = (1.0 - ratio * coeff * self.low_freq_leak_factor).max(1e-6);
        (-10.0 * remaining.log10()).clamp(0.0, 30.0)
    }

    /// Second-order resonance response, clamped to `[0.3, 1.5]`
    pub fn resonance_efficiency(&self, frequency: f64) -> f64 {
        let r = frequency / self.resonance_hz;
        let denom = ((1.0 - r * r).powi(2) + (r / self.resonance_q).powi(2)).sqrt();
        let response = if denom > 0.0 { 1.0 / denom } else { 1.5 };
        response.clamp(0.3, 1.5)
    }

    /// Overall transmission efficiency in `[0, 1]`
    pub fn transmission_efficiency(&self, ratio: f64, frequency: f64) -> f64 {
        let area_efficiency = (1.0 - ratio).max(0.0).sqrt();
        (area_efficiency * self.base_efficiency * self.resonance_efficiency(frequency)).clamp(0.0, 1.0)
    }

    /// Loss (dB) from reduced transmission efficiency, in `[0, 60]`
    pub fn transmission_loss(&self, ratio: f64, frequency: f64) -> f64 {
        let efficiency = self.transmission_efficiency(ratio, frequency).max(0.001);
        (-20.0 * efficiency.log10()).clamp(0.0, MAX_ABG_DB)
    }

    /// ABG (dB, in `[0, 60]`) for a perforation ratio, its area and a frequency
    pub fn compute_transmission_abg(&self, ratio: f64, perforation_area_mm2: f64, frequency: f64) -> f64 {
        if ratio <= 0.0 || ratio.is_nan() {
            return 0.0;
        }

        let leakage = self.leakage_loss(ratio, perforation_area_mm2, frequency);
        let transmission = self.transmission_loss(ratio, frequency);
        let total = leakage + transmission * 0.7;

        let grade = PerforationGrade::from_ratio(ratio);
        let correction = literature::empirical_correction(grade, frequency);

        (total * 0.6 + correction * 0.4).clamp(0.0, MAX_ABG_DB)
    }
}

impl AbgModel for TransmissionModel {
    fn name(&self) -> &'static str {
        "transmission"
    }

    fn compute_abg(&self, state: &PerforationState, frequency: f64) -> f64 {
        self.compute_transmission_abg(state.ratio(), state.perforation_area_mm2(), frequency)
    }
}

/// Sound pressure level (dB SPL re 20 µPa) of a pressure in Pa
pub fn pressure_to_spl(pressure_pa: f64) -> f64 {
    20.0 * (pressure_pa.abs().max(1e-12) / REFERENCE_PRESSURE_PA).log10()
}

/// Pressure (Pa) of a sound pressure level
pub fn spl_to_pressure(spl_db: f64) -> f64 {
    REFERENCE_PRESSURE_PA * 10f64.powf(spl_db / 20.0)
}

/// Level reaching the cochlea once the conductive loss is applied
pub fn attenuated_spl(input_spl_db: f64, abg_db: f64) -> f64 {
    input_spl_db - abg_db.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STANDARD_FREQUENCIES;

    #[test]
    fn no_perforation_no_loss() {
        let m = TransmissionModel::default();
        assert_eq!(m.compute_transmission_abg(0.0, 0.0, 1000.0), 0.0);
        assert_eq!(m.compute_transmission_abg(-0.1, 10.0, 1000.0), 0.0);
        assert_eq!(m.compute_abg(&PerforationState::default(), 500.0), 0.0);
    }

    #[test]
    fn leakage_coefficient_regimes() {
        assert_eq!(TransmissionModel::leakage_coefficient(0.0), 1.0);
        assert!((TransmissionModel::leakage_coefficient(0.05) - 0.875).abs() < 1e-12);
        assert!((TransmissionModel::leakage_coefficient(0.5) - 0.25).abs() < 1e-12);
        assert!((TransmissionModel::leakage_coefficient(2.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn resonance_peaks_at_centre() {
        let m = TransmissionModel::default();
        assert_eq!(m.resonance_efficiency(1000.0), 1.5);
        assert!(m.resonance_efficiency(100.0) > 0.99 && m.resonance_efficiency(100.0) < 1.02);
        assert_eq!(m.resonance_efficiency(20000.0), 0.3);
    }

    #[test]
    fn golden_half_perforation_1khz() {
        let m = TransmissionModel::default();
        let ratio = 0.5;
        let area: f64 = 42.5;
        let f = 1000.0;

        let wavelength = 343.0 / f;
        let r = area.sqrt() / 1000.0 / wavelength;
        let coeff = 1.0 - (r / 0.1_f64).powi(2) * 0.5;
        let leak = -10.0 * (1.0 - ratio * coeff * 0.3_f64).log10();
        // resonance clamps to 1.5 at the centre
        let eff = ((1.0 - ratio).sqrt() * 0.85 * 1.5_f64).min(1.0);
        let trans = -20.0 * eff.log10();
        let expected = (leak + trans * 0.7) * 0.6 + 15.0 * 0.4;

        let got = m.compute_transmission_abg(ratio, area, f);
        assert!((got - expected).abs() < 1e-9, "got {} expected {}", got, expected);
    }

    #[test]
    fn output_is_clamped() {
        let m = TransmissionModel::default();
        for ratio in [0.05, 0.125, 0.375, 0.625, 0.875, 1.0] {
            for &f in STANDARD_FREQUENCIES.iter().chain([20.0, 20000.0].iter()) {
                let v = m.compute_transmission_abg(ratio, ratio * 85.0, f);
                assert!((0.0..=MAX_ABG_DB).contains(&v));
            }
        }
    }

    #[test]
    fn spl_helpers() {
        assert!((pressure_to_spl(REFERENCE_PRESSURE_PA)).abs() < 1e-9);
        assert!((pressure_to_spl(1.0) - 93.979).abs() < 1e-3);
        assert!((spl_to_pressure(pressure_to_spl(0.2)) - 0.2).abs() < 1e-12);
        assert_eq!(attenuated_spl(80.0, 25.0), 55.0);
        assert_eq!(attenuated_spl(80.0, -5.0), 80.0);
    }
}

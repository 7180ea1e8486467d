//! TMSim - Air-bone gap simulation for tympanic membrane perforations
//! The ABG composer: physical terms blended with literature data
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

use crate::constants::{HIGH_BAND, LOW_BAND, MAX_ABG_DB, MID_BAND, NUM_FREQUENCIES, STANDARD_FREQUENCIES};
use crate::literature;
use crate::physical;
use crate::state::{FrequencyResponseRequest, PerforationGrade, PerforationState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A model mapping a perforation state and a frequency to an ABG in dB
///
/// Sweep and validation engines receive an implementation at construction;
/// implementations must be pure so they can be shared across threads.
pub trait AbgModel: Send + Sync {
    /// Short identifier used in logs and reports
    fn name(&self) -> &'static str;

    /// ABG (dB) for one frequency
    fn compute_abg(&self, state: &PerforationState, frequency: f64) -> f64;

    /// ABG at every standard frequency
    fn compute_all(&self, state: &PerforationState) -> [f64; NUM_FREQUENCIES] {
        std::array::from_fn(|i| self.compute_abg(state, STANDARD_FREQUENCIES[i]))
    }

    /// ABG for a request value
    fn respond(&self, request: &FrequencyResponseRequest) -> f64 {
        self.compute_abg(&request.state, request.frequency)
    }
}

impl<T: AbgModel + ?Sized> AbgModel for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn compute_abg(&self, state: &PerforationState, frequency: f64) -> f64 {
        (**self).compute_abg(state, frequency)
    }
}

impl<T: AbgModel + ?Sized> AbgModel for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn compute_abg(&self, state: &PerforationState, frequency: f64) -> f64 {
        (**self).compute_abg(state, frequency)
    }
}

/// Every intermediate term of one ABG evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbgBreakdown {
    pub size_effect: f64,
    pub volume_effect: f64,
    pub position_effect: f64,
    pub frequency_modulation: f64,
    pub shielding: f64,
    /// Physical value after shielding, floored at 0
    pub physical: f64,
    /// Literature value after half shielding, floored at 0
    pub literature: f64,
    /// Blended and clamped ABG
    pub abg: f64,
}

/// The primary ABG composer
///
/// Blends the physical terms of [`physical`] 50/50 with [`literature::LITERATURE_ABG_TABLE`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EarModel;

impl EarModel {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one frequency and keep every intermediate term
    pub fn breakdown(&self, state: &PerforationState, frequency: f64) -> AbgBreakdown {
        if state.grade.is_intact() {
            return AbgBreakdown::default();
        }

        let ratio = state.grade.primary_ratio();
        let size = physical::size_effect(ratio, frequency, state.tympanic_area_mm2);
        let volume = physical::volume_effect(ratio, state.middle_ear_volume_cm3);
        let position = physical::position_effect(state.position_x, state.position_y);
        let freq_mod = physical::frequency_modulation(frequency);
        let shielding = physical::round_window_shielding(ratio, frequency);

        let literature_raw = literature::literature_abg(state.grade, frequency);

        let physical_value = ((size + volume) * freq_mod + position - shielding).max(0.0);
        let literature_value = (literature_raw - shielding * 0.5).max(0.0);

        let abg = (0.5 * physical_value + 0.5 * literature_value).clamp(0.0, MAX_ABG_DB);

        AbgBreakdown {
            size_effect: size,
            volume_effect: volume,
            position_effect: position,
            frequency_modulation: freq_mod,
            shielding,
            physical: physical_value,
            literature: literature_value,
            abg,
        }
    }
}

impl AbgModel for EarModel {
    fn name(&self) -> &'static str {
        "ear"
    }

    fn compute_abg(&self, state: &PerforationState, frequency: f64) -> f64 {
        self.breakdown(state, frequency).abg
    }
}

/// ABG (dB, in `[0, 60]`) from explicit parameters using the primary composer
pub fn compute_abg(
    grade: i64,
    position_x: f64,
    position_y: f64,
    middle_ear_volume_cm3: f64,
    tympanic_area_mm2: f64,
    frequency: f64,
) -> f64 {
    let state = PerforationState::new(
        PerforationGrade::new(grade),
        position_x,
        position_y,
        middle_ear_volume_cm3,
        tympanic_area_mm2,
    );
    EarModel.compute_abg(&state, frequency)
}

/// Low / mid / high / total averages of an ABG curve at the standard frequencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandAverages {
    /// 125, 250, 500 Hz
    pub low: f64,
    /// 1, 2 kHz
    pub mid: f64,
    /// 3, 4, 8 kHz
    pub high: f64,
    /// all eight frequencies
    pub total: f64,
}

impl BandAverages {
    pub fn from_abg(abg: &[f64; NUM_FREQUENCIES]) -> Self {
        let band_mean = |idx: &[usize]| idx.iter().map(|&i| abg[i]).sum::<f64>() / idx.len() as f64;
        Self {
            low: band_mean(&LOW_BAND),
            mid: band_mean(&MID_BAND),
            high: band_mean(&HIGH_BAND),
            total: abg.iter().sum::<f64>() / NUM_FREQUENCIES as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(grade: i64, x: f64, y: f64, vol: f64) -> PerforationState {
        PerforationState::new(PerforationGrade::new(grade), x, y, vol, 85.0)
    }

    #[test]
    fn intact_membrane_has_no_gap() {
        let model = EarModel;
        for &f in &[20.0, 125.0, 1000.0, 8000.0, 20000.0] {
            for &(x, y) in &[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)] {
                for &v in &[0.2, 0.8, 3.0] {
                    assert_eq!(model.compute_abg(&state(0, x, y, v), f), 0.0);
                }
            }
        }
    }

    #[test]
    fn golden_grade3_centre_1khz() {
        let b = EarModel.breakdown(&state(3, 0.5, 0.5, 0.8), 1000.0);
        let size = 20.0 * (1.0 / 0.385_f64).log10();
        assert!((b.size_effect - size).abs() < 1e-9);
        assert!((b.volume_effect - 3.125).abs() < 1e-9);
        assert_eq!(b.position_effect, 0.0);
        assert_eq!(b.frequency_modulation, 1.0);
        assert_eq!(b.shielding, 0.0);
        assert_eq!(b.literature, 24.0);
        let expected = 0.5 * (size + 3.125) + 0.5 * 24.0;
        assert!((b.abg - expected).abs() < 1e-9);
        assert!((b.abg - 17.708).abs() < 1e-3, "abg = {}", b.abg);
    }

    #[test]
    fn abg_is_clamped_for_every_grade_and_frequency() {
        let model = EarModel;
        let mut f = 20.0;
        while f <= 20000.0 {
            for g in 1..=4 {
                for &(x, y) in &[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0), (0.0, 1.0)] {
                    for &v in &[0.1, 0.8, 5.0] {
                        let abg = model.compute_abg(&state(g, x, y, v), f);
                        assert!((0.0..=MAX_ABG_DB).contains(&abg), "abg {} out of range", abg);
                    }
                }
            }
            f *= 1.1;
        }
    }

    #[test]
    fn grade4_is_shielded() {
        let b = EarModel.breakdown(&state(4, 0.5, 0.5, 0.8), 250.0);
        assert!(b.shielding > 0.0);
        let lit = literature::literature_abg(PerforationGrade::new(4), 250.0);
        assert!((b.literature - (lit - b.shielding / 2.0)).abs() < 1e-9);
    }

    #[test]
    fn free_function_matches_model() {
        let direct = EarModel.compute_abg(&state(2, 0.3, 0.7, 1.0), 2000.0);
        assert_eq!(compute_abg(2, 0.3, 0.7, 1.0, 85.0, 2000.0), direct);
        // out-of-range grade clamps rather than panicking
        assert_eq!(compute_abg(12, 0.5, 0.5, 0.8, 85.0, 500.0), compute_abg(4, 0.5, 0.5, 0.8, 85.0, 500.0));
        assert_eq!(compute_abg(-1, 0.5, 0.5, 0.8, 85.0, 500.0), 0.0);
    }

    #[test]
    fn compute_all_and_bands() {
        let abg = EarModel.compute_all(&state(2, 0.5, 0.5, 0.8));
        for (i, &f) in STANDARD_FREQUENCIES.iter().enumerate() {
            assert_eq!(abg[i], EarModel.compute_abg(&state(2, 0.5, 0.5, 0.8), f));
        }
        let bands = BandAverages::from_abg(&[1.0, 2.0, 3.0, 4.0, 6.0, 7.0, 8.0, 9.0]);
        assert!((bands.low - 2.0).abs() < 1e-12);
        assert!((bands.mid - 5.0).abs() < 1e-12);
        assert!((bands.high - 8.0).abs() < 1e-12);
        assert!((bands.total - 5.0).abs() < 1e-12);
    }

    #[test]
    fn shared_handles_delegate() {
        let shared: Arc<dyn AbgModel> = Arc::new(EarModel);
        let s = state(3, 0.2, 0.9, 0.6);
        assert_eq!(shared.compute_abg(&s, 4000.0), EarModel.compute_abg(&s, 4000.0));
        assert_eq!(shared.name(), "ear");
        let req = FrequencyResponseRequest::new(4000.0, s);
        assert_eq!((&EarModel).respond(&req), EarModel.compute_abg(&s, 4000.0));
    }
}

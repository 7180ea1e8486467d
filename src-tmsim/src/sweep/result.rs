//! Sweep result rows and the grade/volume summary

use super::plan::{SweepPoint, quadrant};
use crate::constants::NUM_FREQUENCIES;
use crate::model::{AbgModel, BandAverages};
use crate::state::{PerforationGrade, PerforationState};
use serde::Serialize;
use std::f64::consts::PI;

/// Result of one sweep combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentResult {
    pub grade: PerforationGrade,
    pub pos_x: f64,
    pub pos_y: f64,
    pub middle_ear_volume: f64,
    pub quadrant: u8,
    pub abg_by_frequency: [f64; NUM_FREQUENCIES],
    pub avg_low: f64,
    pub avg_mid: f64,
    pub avg_high: f64,
    pub avg_total: f64,
    pub tm_diameter_mm: f64,
    pub perforation_diameter_mm: f64,
    pub perforation_area_mm2: f64,
}

/// Diameter (mm) of a disc of the given area (mm²)
pub fn diameter_from_area(area_mm2: f64) -> f64 {
    2.0 * (area_mm2.max(0.0) / PI).sqrt()
}

impl ExperimentResult {
    /// Evaluate one sweep point with `model`
    ///
    /// Geometry columns use the visualisation grade table; the ABG values come
    /// from whatever ratio table the model itself uses.
    pub fn evaluate(model: &dyn AbgModel, point: &SweepPoint, tympanic_area_mm2: f64) -> Self {
        let state = PerforationState::new(
            point.grade,
            point.position_x,
            point.position_y,
            point.middle_ear_volume_cm3,
            tympanic_area_mm2,
        );
        let abg = model.compute_all(&state);
        let perforation_area = point.grade.visualization_ratio() * tympanic_area_mm2;
        Self::from_parts(
            point.grade,
            state.position_x,
            state.position_y,
            point.middle_ear_volume_cm3,
            abg,
            diameter_from_area(tympanic_area_mm2),
            perforation_area,
        )
    }

    /// Assemble a row, deriving quadrant, band averages and perforation diameter
    pub fn from_parts(
        grade: PerforationGrade,
        pos_x: f64,
        pos_y: f64,
        middle_ear_volume: f64,
        abg_by_frequency: [f64; NUM_FREQUENCIES],
        tm_diameter_mm: f64,
        perforation_area_mm2: f64,
    ) -> Self {
        let bands = BandAverages::from_abg(&abg_by_frequency);
        Self {
            grade,
            pos_x,
            pos_y,
            middle_ear_volume,
            quadrant: quadrant(pos_x, pos_y),
            abg_by_frequency,
            avg_low: bands.low,
            avg_mid: bands.mid,
            avg_high: bands.high,
            avg_total: bands.total,
            tm_diameter_mm,
            perforation_diameter_mm: diameter_from_area(perforation_area_mm2),
            perforation_area_mm2,
        }
    }

    pub fn bands(&self) -> BandAverages {
        BandAverages {
            low: self.avg_low,
            mid: self.avg_mid,
            high: self.avg_high,
            total: self.avg_total,
        }
    }
}

/// Mean of every numeric column over the grid for one (grade, volume) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeVolumeSummary {
    pub grade: PerforationGrade,
    pub middle_ear_volume: f64,
    /// Number of grid positions averaged
    pub samples: usize,
    pub tm_diameter_mm: f64,
    pub perforation_diameter_mm: f64,
    pub perforation_area_mm2: f64,
    pub abg_by_frequency: [f64; NUM_FREQUENCIES],
    pub avg_low: f64,
    pub avg_mid: f64,
    pub avg_high: f64,
    pub avg_total: f64,
}

#[derive(Default)]
struct Accumulator {
    samples: usize,
    tm_diameter: f64,
    perforation_diameter: f64,
    perforation_area: f64,
    abg: [f64; NUM_FREQUENCIES],
    low: f64,
    mid: f64,
    high: f64,
    total: f64,
}

/// Average results per (grade, volume) pair, in first-seen order
pub fn summarize(results: &[ExperimentResult]) -> Vec<GradeVolumeSummary> {
    let mut keys: Vec<(PerforationGrade, f64)> = Vec::new();
    let mut accs: Vec<Accumulator> = Vec::new();

    for r in results {
        let slot = match keys
            .iter()
            .position(|&(g, v)| g == r.grade && v == r.middle_ear_volume)
        {
            Some(i) => i,
            None => {
                keys.push((r.grade, r.middle_ear_volume));
                accs.push(Accumulator::default());
                keys.len() - 1
            }
        };
        let acc = &mut accs[slot];
        acc.samples += 1;
        acc.tm_diameter += r.tm_diameter_mm;
        acc.perforation_diameter += r.perforation_diameter_mm;
        acc.perforation_area += r.perforation_area_mm2;
        for (sum, v) in acc.abg.iter_mut().zip(r.abg_by_frequency.iter()) {
            *sum += v;
        }
        acc.low += r.avg_low;
        acc.mid += r.avg_mid;
        acc.high += r.avg_high;
        acc.total += r.avg_total;
    }

    keys.into_iter()
        .zip(accs)
        .map(|((grade, volume), acc)| {
            let n = acc.samples as f64;
            GradeVolumeSummary {
                grade,
                middle_ear_volume: volume,
                samples: acc.samples,
                tm_diameter_mm: acc.tm_diameter / n,
                perforation_diameter_mm: acc.perforation_diameter / n,
                perforation_area_mm2: acc.perforation_area / n,
                abg_by_frequency: acc.abg.map(|s| s / n),
                avg_low: acc.low / n,
                avg_mid: acc.mid / n,
                avg_high: acc.high / n,
                avg_total: acc.total / n,
            }
        })
        .collect()
}

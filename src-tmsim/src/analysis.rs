//! Post-sweep analysis against clinical data
//!
//! Works on the rows of a full sweep (freshly computed or read back from
//! CSV). Intact rows are ignored throughout.

use crate::constants::STANDARD_FREQUENCIES;
use crate::literature::nearest_freq_index;
use crate::state::PerforationGrade;
use crate::sweep::ExperimentResult;
use crate::validation::{FrequencyComparison, PatientRecord, mean, population_std_dev, std_dev};
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;

const POSITION_EPS: f64 = 1e-6;

/// Spread of `AvgTotal` for one grade over every position and volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeStats {
    pub grade: PerforationGrade,
    pub samples: usize,
    pub mean_db: f64,
    pub std_db: f64,
}

/// Per-grade clinical reference curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalReference {
    pub grade: PerforationGrade,
    pub patients: usize,
    /// Mean over every measurement of every patient of this grade
    pub mean_db: f64,
    /// Frequency (Hz) → mean measured ABG
    pub curve: BTreeMap<u32, f64>,
}

/// Mean `AvgTotal` per grid position for one grade
#[derive(Debug, Clone, PartialEq)]
pub struct PositionHeatmap {
    pub grade: PerforationGrade,
    /// Sorted grid coordinates shared by both axes
    pub positions: Vec<f64>,
    /// `values[[iy, ix]]`; NaN where the sweep has no row
    pub values: Array2<f64>,
}

/// Grid position whose simulated mean is closest to a clinical target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestPosition {
    pub grade: PerforationGrade,
    pub position_x: f64,
    pub position_y: f64,
    pub simulated_db: f64,
    pub error_db: f64,
}

/// Mean-position versus best-position error for one grade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorComparison {
    pub grade: PerforationGrade,
    pub clinical_db: f64,
    pub simulated_mean_db: f64,
    /// simulated mean − clinical
    pub mean_error_db: f64,
    pub best: BestPosition,
    /// best position value − clinical
    pub best_error_db: f64,
}

/// Simulated and clinical curves of one grade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyCurveComparison {
    pub grade: PerforationGrade,
    pub points: Vec<FrequencyComparison>,
    /// mean(simulated) − mean(clinical) over the compared frequencies
    pub mean_error_db: f64,
}

/// Spread of the per-patient average ABG
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientAbgStats {
    pub patients: usize,
    pub mean_db: f64,
    /// Population standard deviation
    pub std_db: f64,
    pub min_db: f64,
    pub max_db: f64,
}

/// One surgical group against the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub group: String,
    pub abg: PatientAbgStats,
    /// group mean − simulated mean
    pub difference_db: f64,
}

/// Surgical groups against every simulated perforated row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub simulated_samples: usize,
    pub simulated_mean_db: f64,
    /// Population standard deviation of `AvgTotal`
    pub simulated_std_db: f64,
    pub groups: Vec<GroupStats>,
}

/// Everything computed by [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    pub grade_stats: Vec<GradeStats>,
    pub clinical: Vec<ClinicalReference>,
    pub comparisons: Vec<ErrorComparison>,
    /// Curves averaged over every position
    pub frequency: Vec<FrequencyCurveComparison>,
    /// Curves read at each grade's best position
    pub best_position_frequency: Vec<FrequencyCurveComparison>,
    /// (grade, max − min of the position means)
    pub position_effect: Vec<(PerforationGrade, f64)>,
    pub patient_stats: Option<PatientAbgStats>,
    /// `None` when no patient carries a group label
    pub groups: Option<GroupComparison>,
}

fn perforated_grades(results: &[ExperimentResult]) -> Vec<PerforationGrade> {
    let mut grades: Vec<PerforationGrade> =
        results.iter().map(|r| r.grade).filter(|g| !g.is_intact()).collect();
    grades.sort();
    grades.dedup();
    grades
}

fn rows_of(results: &[ExperimentResult], grade: PerforationGrade) -> impl Iterator<Item = &ExperimentResult> {
    results.iter().filter(move |r| r.grade == grade)
}

/// Mean and sample standard deviation of `AvgTotal` per perforated grade
pub fn grade_stats(results: &[ExperimentResult]) -> Vec<GradeStats> {
    perforated_grades(results)
        .into_iter()
        .map(|grade| {
            let totals: Vec<f64> = rows_of(results, grade).map(|r| r.avg_total).collect();
            GradeStats {
                grade,
                samples: totals.len(),
                mean_db: mean(&totals),
                std_db: std_dev(&totals),
            }
        })
        .collect()
}

/// Group patient records into per-grade reference curves
pub fn clinical_reference(patients: &[PatientRecord]) -> Vec<ClinicalReference> {
    let mut grouped: BTreeMap<PerforationGrade, Vec<&PatientRecord>> = BTreeMap::new();
    for p in patients.iter().filter(|p| !p.grade.is_intact()) {
        grouped.entry(p.grade).or_default().push(p);
    }
    grouped
        .into_iter()
        .map(|(grade, group)| {
            let mut at: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
            for p in &group {
                for (&f, &v) in &p.abg_by_frequency {
                    at.entry(f).or_default().push(v);
                }
            }
            let all: Vec<f64> = at.values().flatten().copied().collect();
            ClinicalReference {
                grade,
                patients: group.len(),
                mean_db: mean(&all),
                curve: at.iter().map(|(&f, v)| (f, mean(v))).collect(),
            }
        })
        .collect()
}

fn unique_sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() < POSITION_EPS);
    values
}

fn slot(positions: &[f64], v: f64) -> Option<usize> {
    positions.iter().position(|p| (p - v).abs() < POSITION_EPS)
}

/// Mean `AvgTotal` per (PosX, PosY) for `grade`, averaged over volumes
pub fn position_heatmap(results: &[ExperimentResult], grade: PerforationGrade) -> Option<PositionHeatmap> {
    let rows: Vec<&ExperimentResult> = rows_of(results, grade).collect();
    if rows.is_empty() {
        return None;
    }
    let positions = unique_sorted(rows.iter().flat_map(|r| [r.pos_x, r.pos_y]).collect());
    let n = positions.len();
    let mut sums = Array2::<f64>::zeros((n, n));
    let mut counts = Array2::<f64>::zeros((n, n));
    for r in rows {
        if let (Some(ix), Some(iy)) = (slot(&positions, r.pos_x), slot(&positions, r.pos_y)) {
            sums[[iy, ix]] += r.avg_total;
            counts[[iy, ix]] += 1.0;
        }
    }
    let values = ndarray::Zip::from(&sums)
        .and(&counts)
        .map_collect(|&s, &c| if c > 0.0 { s / c } else { f64::NAN });
    Some(PositionHeatmap { grade, positions, values })
}

/// Grid cell closest to `clinical_db`; rows (y) outer, columns (x) inner, first
/// found wins on ties
pub fn best_position(heatmap: &PositionHeatmap, clinical_db: f64) -> Option<BestPosition> {
    let mut best: Option<BestPosition> = None;
    for (iy, &y) in heatmap.positions.iter().enumerate() {
        for (ix, &x) in heatmap.positions.iter().enumerate() {
            let sim = heatmap.values[[iy, ix]];
            if sim.is_nan() {
                continue;
            }
            let error = (sim - clinical_db).abs();
            if best.is_none_or(|b| error < b.error_db) {
                best = Some(BestPosition {
                    grade: heatmap.grade,
                    position_x: x,
                    position_y: y,
                    simulated_db: sim,
                    error_db: error,
                });
            }
        }
    }
    best
}

/// Max − min of the position means of `grade`
pub fn position_effect_range(results: &[ExperimentResult], grade: PerforationGrade) -> Option<f64> {
    let heatmap = position_heatmap(results, grade)?;
    let finite: Vec<f64> = heatmap.values.iter().copied().filter(|v| v.is_finite()).collect();
    let max = finite.iter().copied().reduce(f64::max)?;
    let min = finite.iter().copied().reduce(f64::min)?;
    Some(max - min)
}

/// Mean-position and best-position error against every clinical grade
pub fn clinical_comparison(results: &[ExperimentResult], clinical: &[ClinicalReference]) -> Vec<ErrorComparison> {
    clinical
        .iter()
        .filter_map(|reference| {
            let totals: Vec<f64> = rows_of(results, reference.grade).map(|r| r.avg_total).collect();
            if totals.is_empty() {
                log::warn!("no simulated rows for grade {}, skipped", reference.grade);
                return None;
            }
            let simulated_mean = mean(&totals);
            let heatmap = position_heatmap(results, reference.grade)?;
            let best = best_position(&heatmap, reference.mean_db)?;
            Some(ErrorComparison {
                grade: reference.grade,
                clinical_db: reference.mean_db,
                simulated_mean_db: simulated_mean,
                mean_error_db: simulated_mean - reference.mean_db,
                best,
                best_error_db: best.simulated_db - reference.mean_db,
            })
        })
        .collect()
}

fn curve_comparison(reference: &ClinicalReference, rows: &[&ExperimentResult]) -> FrequencyCurveComparison {
    let points: Vec<FrequencyComparison> = reference
        .curve
        .iter()
        .map(|(&f, &clinical_db)| {
            let col = nearest_freq_index(f as f64);
            let column: Vec<f64> = rows.iter().map(|r| r.abg_by_frequency[col]).collect();
            let simulated_db = mean(&column);
            log::trace!(
                "grade {} {} Hz (column {} Hz): sim {:.2} clinical {:.2}",
                reference.grade,
                f,
                STANDARD_FREQUENCIES[col],
                simulated_db,
                clinical_db
            );
            FrequencyComparison {
                frequency_hz: f,
                clinical_db,
                simulated_db,
                error_db: simulated_db - clinical_db,
            }
        })
        .collect();
    let sim: Vec<f64> = points.iter().map(|p| p.simulated_db).collect();
    let clin: Vec<f64> = points.iter().map(|p| p.clinical_db).collect();
    FrequencyCurveComparison {
        grade: reference.grade,
        mean_error_db: mean(&sim) - mean(&clin),
        points,
    }
}

/// Simulated per-frequency means against each clinical curve
///
/// A clinical frequency is matched to the nearest standard sweep column.
pub fn frequency_comparison(
    results: &[ExperimentResult],
    clinical: &[ClinicalReference],
) -> Vec<FrequencyCurveComparison> {
    clinical
        .iter()
        .filter_map(|reference| {
            let rows: Vec<&ExperimentResult> = rows_of(results, reference.grade).collect();
            if rows.is_empty() {
                return None;
            }
            Some(curve_comparison(reference, &rows))
        })
        .collect()
}

/// Per-frequency curves read at each grade's best position
///
/// Rows at the best cell are averaged over volumes. A grade whose best cell
/// has no rows falls back to every row of that grade.
pub fn best_position_frequency_comparison(
    results: &[ExperimentResult],
    clinical: &[ClinicalReference],
    comparisons: &[ErrorComparison],
) -> Vec<FrequencyCurveComparison> {
    clinical
        .iter()
        .filter_map(|reference| {
            let best = comparisons.iter().find(|c| c.grade == reference.grade)?.best;
            let mut rows: Vec<&ExperimentResult> = rows_of(results, reference.grade)
                .filter(|r| {
                    (r.pos_x - best.position_x).abs() < POSITION_EPS
                        && (r.pos_y - best.position_y).abs() < POSITION_EPS
                })
                .collect();
            if rows.is_empty() {
                log::warn!("grade {}: no rows at the best position, using every position", reference.grade);
                rows = rows_of(results, reference.grade).collect();
            }
            if rows.is_empty() {
                return None;
            }
            Some(curve_comparison(reference, &rows))
        })
        .collect()
}

fn abg_stats(values: &[f64]) -> Option<PatientAbgStats> {
    let max_db = values.iter().copied().reduce(f64::max)?;
    let min_db = values.iter().copied().reduce(f64::min)?;
    Some(PatientAbgStats {
        patients: values.len(),
        mean_db: mean(values),
        std_db: population_std_dev(values),
        min_db,
        max_db,
    })
}

fn patient_averages<'a>(patients: impl IntoIterator<Item = &'a PatientRecord>) -> Vec<f64> {
    patients
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(PatientRecord::average_abg)
        .collect()
}

/// Count, mean, spread and range of the per-patient average ABG
///
/// Patients without any measurement are left out.
pub fn patient_abg_stats(patients: &[PatientRecord]) -> Option<PatientAbgStats> {
    abg_stats(&patient_averages(patients))
}

/// Per-group patient ABG against the mean `AvgTotal` of every perforated row
///
/// Groups are listed in first-seen order; unlabelled patients are ignored.
pub fn group_comparison(results: &[ExperimentResult], patients: &[PatientRecord]) -> Option<GroupComparison> {
    let mut labels: Vec<&str> = Vec::new();
    for g in patients.iter().filter_map(|p| p.group.as_deref()) {
        if !labels.contains(&g) {
            labels.push(g);
        }
    }
    if labels.is_empty() {
        return None;
    }
    let simulated: Vec<f64> = results
        .iter()
        .filter(|r| !r.grade.is_intact())
        .map(|r| r.avg_total)
        .collect();
    let simulated_mean_db = mean(&simulated);
    let groups = labels
        .into_iter()
        .filter_map(|label| {
            let averages = patient_averages(patients.iter().filter(|p| p.group.as_deref() == Some(label)));
            let abg = abg_stats(&averages)?;
            Some(GroupStats {
                group: label.to_string(),
                difference_db: abg.mean_db - simulated_mean_db,
                abg,
            })
        })
        .collect();
    Some(GroupComparison {
        simulated_samples: simulated.len(),
        simulated_mean_db,
        simulated_std_db: population_std_dev(&simulated),
        groups,
    })
}

/// Run every analysis over a full sweep and a patient set
pub fn analyze(results: &[ExperimentResult], patients: &[PatientRecord]) -> AnalysisReport {
    let clinical = clinical_reference(patients);
    let position_effect = perforated_grades(results)
        .into_iter()
        .filter_map(|g| position_effect_range(results, g).map(|r| (g, r)))
        .collect();
    let comparisons = clinical_comparison(results, &clinical);
    AnalysisReport {
        rows: results.len(),
        grade_stats: grade_stats(results),
        frequency: frequency_comparison(results, &clinical),
        best_position_frequency: best_position_frequency_comparison(results, &clinical, &comparisons),
        comparisons,
        position_effect,
        patient_stats: patient_abg_stats(patients),
        groups: group_comparison(results, patients),
        clinical,
    }
}

//! Parameter sweep over grade, position and middle-ear volume
//!
//! The engine only knows the [`AbgModel`](crate::model::AbgModel) contract; the
//! model is injected into the [`SweepRunner`]. A sweep can be stepped by the
//! caller, run to completion in batch or paced mode, or farmed out to rayon.

pub mod plan;
pub mod result;
pub mod runner;

pub use plan::{
    SweepPlan, SweepPoint, checked_total_combinations, grid_position, quadrant, total_combinations,
};
pub use result::{ExperimentResult, GradeVolumeSummary, diameter_from_area, summarize};
pub use runner::{ProgressCallback, SweepReport, SweepRunner};

use crate::constants::{DEFAULT_GRID_SIZE, DEFAULT_SWEEP_VOLUMES, DEFAULT_TYMPANIC_AREA_MM2};
use crate::error::{Result, TmSimError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How the runner schedules combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// As fast as possible
    #[default]
    Batch,
    /// Wait `delay` between two combinations
    Paced { delay: Duration },
}

/// Action returned by a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// Progress notification sent after each combination
#[derive(Debug, Clone)]
pub struct SweepProgress {
    pub completed: usize,
    pub total: usize,
    pub latest: ExperimentResult,
}

impl SweepProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Shared cancellation flag, cheap to clone across threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sweep configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    /// Number of grid lines per axis
    pub grid_size: usize,
    /// Middle-ear volumes to sweep (cm³)
    pub volumes: Vec<f64>,
    /// Tympanic membrane area (mm²)
    pub tympanic_area_mm2: f64,
    pub mode: ExecutionMode,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            volumes: DEFAULT_SWEEP_VOLUMES.to_vec(),
            tympanic_area_mm2: DEFAULT_TYMPANIC_AREA_MM2,
            mode: ExecutionMode::Batch,
        }
    }
}

impl SweepConfig {
    pub fn builder() -> SweepConfigBuilder {
        SweepConfigBuilder::new()
    }

    /// Total number of combinations this configuration produces
    pub fn total_combinations(&self) -> usize {
        total_combinations(self.grid_size, self.volumes.len())
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(TmSimError::InvalidConfig("grid size must be at least 1".into()));
        }
        if self.volumes.is_empty() {
            return Err(TmSimError::InvalidConfig("at least one middle-ear volume is required".into()));
        }
        if let Some(v) = self.volumes.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(TmSimError::InvalidConfig(format!(
                "middle-ear volume must be a positive number, got {}",
                v
            )));
        }
        if !(self.tympanic_area_mm2.is_finite() && self.tympanic_area_mm2 > 0.0) {
            return Err(TmSimError::InvalidConfig(format!(
                "tympanic area must be positive, got {}",
                self.tympanic_area_mm2
            )));
        }
        if checked_total_combinations(self.grid_size, self.volumes.len()).is_none() {
            return Err(TmSimError::InvalidConfig(format!(
                "grid size {} with {} volumes gives more combinations than can be counted",
                self.grid_size,
                self.volumes.len()
            )));
        }
        Ok(())
    }
}

/// Fluent builder for [`SweepConfig`]
pub struct SweepConfigBuilder {
    cfg: SweepConfig,
}

impl Default for SweepConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepConfigBuilder {
    pub fn new() -> Self {
        Self { cfg: SweepConfig::default() }
    }
    pub fn grid_size(mut self, v: usize) -> Self {
        self.cfg.grid_size = v;
        self
    }
    pub fn volumes(mut self, v: Vec<f64>) -> Self {
        self.cfg.volumes = v;
        self
    }
    pub fn tympanic_area(mut self, v: f64) -> Self {
        self.cfg.tympanic_area_mm2 = v;
        self
    }
    pub fn mode(mut self, v: ExecutionMode) -> Self {
        self.cfg.mode = v;
        self
    }
    pub fn paced(mut self, delay: Duration) -> Self {
        self.cfg.mode = ExecutionMode::Paced { delay };
        self
    }
    pub fn build(self) -> SweepConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AbgModel, EarModel};
    use crate::propagation::TransmissionModel;
    use std::sync::Mutex;

    fn ear() -> Arc<dyn AbgModel> {
        Arc::new(EarModel)
    }

    #[test]
    fn default_config_counts_303() {
        let cfg = SweepConfig::default();
        assert_eq!(cfg.total_combinations(), 303);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = SweepConfig::builder()
            .grid_size(3)
            .volumes(vec![1.0])
            .tympanic_area(70.0)
            .paced(Duration::from_millis(1))
            .build();
        assert_eq!(cfg.grid_size, 3);
        assert_eq!(cfg.volumes, vec![1.0]);
        assert_eq!(cfg.tympanic_area_mm2, 70.0);
        assert_eq!(cfg.mode, ExecutionMode::Paced { delay: Duration::from_millis(1) });
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(SweepConfig::builder().grid_size(0).build().validate().is_err());
        assert!(SweepConfig::builder().volumes(vec![]).build().validate().is_err());
        assert!(SweepConfig::builder().volumes(vec![0.8, -1.0]).build().validate().is_err());
        assert!(SweepConfig::builder().tympanic_area(0.0).build().validate().is_err());
        assert!(SweepRunner::new(ear(), SweepConfig::builder().grid_size(0).build()).is_err());
        let huge = SweepConfig::builder().grid_size(1 << 33).build();
        assert!(matches!(huge.validate(), Err(TmSimError::InvalidConfig(_))));
    }

    #[test]
    fn large_grid_runner_is_created_lazily() {
        let cfg = SweepConfig::builder().grid_size(100_000).volumes(vec![0.8]).build();
        let mut runner = SweepRunner::new(ear(), cfg).unwrap();
        assert_eq!(runner.total(), 40_000_000_001);
        assert!(runner.step().is_some());
        assert!(runner.step().is_some());
        let report = runner.into_report();
        assert_eq!(report.completed(), 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn full_batch_run() {
        let report = SweepRunner::new(ear(), SweepConfig::default()).unwrap().run();
        assert_eq!(report.completed(), 303);
        assert!(report.is_complete());
        assert!(!report.cancelled);
        // every intact row is zero
        for r in report.results.iter().filter(|r| r.grade.is_intact()) {
            assert_eq!(r.abg_by_frequency, [0.0; 8]);
            assert_eq!((r.pos_x, r.pos_y), (0.5, 0.5));
        }
        assert_eq!(report.summary().len(), 15);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let a = SweepRunner::new(ear(), SweepConfig::default()).unwrap().run();
        let b = SweepRunner::new(ear(), SweepConfig::default()).unwrap().run();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn parallel_matches_sequential() {
        let model: Arc<dyn AbgModel> = Arc::new(TransmissionModel::default());
        let seq = SweepRunner::new(model.clone(), SweepConfig::default()).unwrap().run();
        let par = SweepRunner::new(model, SweepConfig::default()).unwrap().run_parallel();
        assert_eq!(seq.results, par.results);
        assert!(par.is_complete());
    }

    /// Cancels its token after a number of ABG evaluations
    struct CancelAfter {
        token: CancelToken,
        remaining: std::sync::atomic::AtomicUsize,
    }

    impl AbgModel for CancelAfter {
        fn name(&self) -> &'static str {
            "cancel-after"
        }
        fn compute_abg(&self, state: &crate::state::PerforationState, frequency: f64) -> f64 {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.token.cancel();
            }
            EarModel.compute_abg(state, frequency)
        }
    }

    #[test]
    fn parallel_cancellation_keeps_a_plan_prefix() {
        let cfg = SweepConfig::builder().grid_size(20).volumes(vec![0.8, 1.2]).build();
        let full = SweepRunner::new(ear(), cfg.clone()).unwrap().run();
        let token = CancelToken::new();
        let model = Arc::new(CancelAfter {
            token: token.clone(),
            remaining: std::sync::atomic::AtomicUsize::new(1500 * 8),
        });
        let report = SweepRunner::new(model, cfg)
            .unwrap()
            .with_cancel_token(token)
            .run_parallel();
        assert!(report.cancelled);
        assert!(report.completed() < full.completed());
        assert_eq!(report.results[..], full.results[..report.completed()]);
        assert!(report.message.contains(&format!("{}/3202", report.completed())));
    }

    #[test]
    fn cancellation_keeps_partial_results() {
        let mut runner = SweepRunner::new(ear(), SweepConfig::default()).unwrap();
        let token = runner.cancel_token();
        for _ in 0..10 {
            assert!(runner.step().is_some());
        }
        let snapshot = runner.results().to_vec();
        token.cancel();
        assert!(runner.step().is_none());
        let report = runner.run();
        assert!(report.cancelled);
        assert_eq!(report.completed(), 10);
        assert_eq!(report.results, snapshot);
        assert!(report.message.contains("10/303"));
    }

    #[test]
    fn callback_can_stop_the_sweep() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let report = SweepRunner::new(ear(), SweepConfig::default())
            .unwrap()
            .with_callback(Box::new(move |p: &SweepProgress| {
                sink.lock().unwrap().push(p.completed);
                if p.completed >= 5 { CallbackAction::Stop } else { CallbackAction::Continue }
            }))
            .run();
        assert_eq!(report.completed(), 5);
        assert!(report.cancelled);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn paced_run_honours_cancellation_from_another_thread() {
        let cfg = SweepConfig::builder()
            .grid_size(1)
            .volumes(vec![0.8])
            .paced(Duration::from_millis(200))
            .build();
        let runner = SweepRunner::new(ear(), cfg).unwrap();
        let token = runner.cancel_token();
        let handle = std::thread::spawn(move || runner.run());
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
        let report = handle.join().unwrap();
        assert!(report.cancelled);
        assert!(report.completed() >= 1 && report.completed() < 5);
    }

    #[test]
    fn progress_fraction() {
        let latest = ExperimentResult::from_parts(
            crate::state::PerforationGrade::INTACT,
            0.5,
            0.5,
            0.8,
            [0.0; 8],
            10.0,
            0.0,
        );
        let p = SweepProgress { completed: 3, total: 12, latest };
        assert!((p.fraction() - 0.25).abs() < 1e-12);
    }
}

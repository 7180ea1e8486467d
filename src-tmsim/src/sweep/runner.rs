//! Sweep execution: caller-driven stepping, batch, paced and parallel runs

use super::plan::SweepPlan;
use super::result::{ExperimentResult, GradeVolumeSummary, summarize};
use super::{CallbackAction, CancelToken, ExecutionMode, SweepConfig, SweepProgress};
use crate::error::Result;
use crate::model::AbgModel;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Per-combination callback; returning `Stop` ends the sweep after this row
pub type ProgressCallback = Box<dyn FnMut(&SweepProgress) -> CallbackAction + Send>;

/// Longest uninterrupted sleep while pacing, so cancellation stays responsive
const PACING_SLICE: Duration = Duration::from_millis(50);

/// Upper bound on rows reserved before the first step
const MAX_PREALLOCATED_ROWS: usize = 4096;

/// Combinations handed to rayon at once by [`SweepRunner::run_parallel`]
const PARALLEL_CHUNK: usize = 1024;

/// Outcome of a sweep run
#[derive(Clone)]
pub struct SweepReport {
    pub results: Vec<ExperimentResult>,
    pub total: usize,
    pub cancelled: bool,
    pub message: String,
    pub elapsed: Duration,
}

impl SweepReport {
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.results.len() == self.total
    }

    /// Grade/volume averaged table of the collected rows
    pub fn summary(&self) -> Vec<GradeVolumeSummary> {
        summarize(&self.results)
    }
}

impl fmt::Debug for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepReport")
            .field("results", &format!("len={}", self.results.len()))
            .field("total", &self.total)
            .field("cancelled", &self.cancelled)
            .field("message", &self.message)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

/// Runs an experiment sweep against an injected model
pub struct SweepRunner {
    model: Arc<dyn AbgModel>,
    config: SweepConfig,
    plan: SweepPlan,
    results: Vec<ExperimentResult>,
    cancel: CancelToken,
    callback: Option<ProgressCallback>,
    stopped_by_callback: bool,
    started: Option<Instant>,
}

impl SweepRunner {
    /// Validate `config` and prepare a sweep over it
    pub fn new(model: Arc<dyn AbgModel>, config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let plan = SweepPlan::new(&config.volumes, config.grid_size);
        let capacity = plan.total().min(MAX_PREALLOCATED_ROWS);
        Ok(Self {
            model,
            config,
            plan,
            results: Vec::with_capacity(capacity),
            cancel: CancelToken::new(),
            callback: None,
            stopped_by_callback: false,
            started: None,
        })
    }

    /// Attach a per-combination progress callback
    pub fn with_callback(mut self, cb: ProgressCallback) -> Self {
        self.callback = Some(cb);
        self
    }

    /// Share an externally owned cancellation token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle that stops the sweep from another thread or a signal handler
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn total(&self) -> usize {
        self.plan.total()
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &[ExperimentResult] {
        &self.results
    }

    fn halted(&self) -> bool {
        self.stopped_by_callback || self.cancel.is_cancelled()
    }

    /// Evaluate the next combination
    ///
    /// Returns `None` once the plan is exhausted or the sweep was stopped;
    /// rows already collected are never touched.
    pub fn step(&mut self) -> Option<&ExperimentResult> {
        if self.halted() {
            return None;
        }
        self.started.get_or_insert_with(Instant::now);

        let point = self.plan.next()?;
        let result = ExperimentResult::evaluate(self.model.as_ref(), &point, self.config.tympanic_area_mm2);
        log::debug!(
            "[{}/{}] grade {} pos ({:.2}, {:.2}) volume {:.2} cm³ → avg {:.2} dB",
            point.index + 1,
            self.plan.total(),
            result.grade,
            result.pos_x,
            result.pos_y,
            result.middle_ear_volume,
            result.avg_total
        );

        if let Some(cb) = self.callback.as_mut() {
            let progress = SweepProgress {
                completed: self.results.len() + 1,
                total: self.plan.total(),
                latest: result.clone(),
            };
            if matches!(cb(&progress), CallbackAction::Stop) {
                self.stopped_by_callback = true;
            }
        }

        self.results.push(result);
        self.results.last()
    }

    fn pause(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(PACING_SLICE));
        }
    }

    /// Run every remaining combination, honouring the configured pacing
    pub fn run(mut self) -> SweepReport {
        log::info!(
            "starting sweep with model '{}': {} combinations (grid {}x{}, {} volumes, {:?})",
            self.model.name(),
            self.plan.total(),
            self.config.grid_size,
            self.config.grid_size,
            self.config.volumes.len(),
            self.config.mode
        );
        let delay = match self.config.mode {
            ExecutionMode::Batch => None,
            ExecutionMode::Paced { delay } => Some(delay),
        };

        while self.step().is_some() {
            if let Some(d) = delay {
                if self.results.len() < self.plan.total() {
                    self.pause(d);
                }
            }
        }
        self.into_report()
    }

    /// Evaluate every remaining combination on the rayon pool
    ///
    /// No pacing and no callback. The plan is evaluated in chunks and
    /// cancellation is checked per combination. Rows are returned in plan
    /// order and always form a prefix of the plan: once a combination is
    /// skipped, everything after it is dropped too.
    pub fn run_parallel(mut self) -> SweepReport {
        self.started.get_or_insert_with(Instant::now);
        log::info!(
            "starting parallel sweep with model '{}': {} combinations",
            self.model.name(),
            self.plan.total()
        );
        let model = self.model.clone();
        let cancel = self.cancel.clone();
        let area = self.config.tympanic_area_mm2;
        loop {
            let chunk: Vec<_> = self.plan.by_ref().take(PARALLEL_CHUNK).collect();
            if chunk.is_empty() {
                break;
            }
            let computed: Vec<Option<ExperimentResult>> = chunk
                .par_iter()
                .map(|p| {
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(ExperimentResult::evaluate(model.as_ref(), p, area))
                    }
                })
                .collect();
            let evaluated = computed.len();
            let before = self.results.len();
            self.results.extend(computed.into_iter().map_while(|r| r));
            if self.results.len() - before < evaluated {
                break;
            }
        }
        self.into_report()
    }

    /// Stop here and hand back what was collected
    pub fn into_report(self) -> SweepReport {
        let total = self.plan.total();
        let cancelled = self.halted() && self.results.len() < total;
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let message = if cancelled {
            log::warn!("sweep stopped after {}/{} combinations", self.results.len(), total);
            format!("Sweep cancelled after {}/{} combinations", self.results.len(), total)
        } else if self.results.len() == total {
            log::info!("sweep completed: {} combinations in {:.2?}", total, elapsed);
            format!("Sweep completed: {} combinations", total)
        } else {
            format!("Sweep paused after {}/{} combinations", self.results.len(), total)
        };
        SweepReport {
            results: self.results,
            total,
            cancelled,
            message,
            elapsed,
        }
    }
}

//! Parallel training orchestrator.
//!
//! Discovers the category set of a training frame, trains one model per
//! category on a private rayon pool and collects `(category, model, forecast)`
//! triples into ordered stores.
//!
//! Workers never touch the stores. Each task owns its category slice, shares
//! the holiday calendar read-only through an `Arc`, and reports back over an
//! `mpsc` channel. A single collecting loop on the calling thread performs
//! every insertion.
//!
//! With a category timeout set, each fit runs on its own thread and the pool
//! task waits for it with a deadline, so a hung model never pins a worker.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use shelfcast_core::domain::{Category, ForecastResult, TimeSeriesRow, TrainingFrame};
use shelfcast_core::holidays::{HolidayCalendar, HolidayError, HolidayProvider};
use shelfcast_core::model::{Forecaster, ModelConfig};
use thiserror::Error;

use crate::trainer::{train_category, TrainError, TrainOutput};

/// Category → fitted model handle.
pub type ModelStore<M> = BTreeMap<Category, M>;

/// Category → forecast.
pub type ResultStore = BTreeMap<Category, ForecastResult>;

/// What happens to the batch when one category fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// First failure aborts the batch. Stores keep whatever was collected.
    FailFast,
    /// Failures are recorded per category; siblings keep going.
    #[default]
    Isolate,
}

/// Orchestrator knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Worker threads. 0 = one per available core.
    pub workers: usize,
    pub failure_policy: FailurePolicy,
    /// Wall-clock budget per category, measured from task start. An expired
    /// category frees its worker and is reported as `TimedOut`.
    pub category_timeout: Option<Duration>,
    pub model_config: ModelConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            failure_policy: FailurePolicy::Isolate,
            category_timeout: None,
            model_config: ModelConfig::retail(),
        }
    }
}

/// A category that did not produce a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFailure {
    pub category: Category,
    pub error: TrainError,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("training aborted: {0}")]
    CategoryFailed(#[source] TrainError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("holiday provider failed: {0}")]
    Holidays(#[from] HolidayError),

    #[error("forecast horizon must be at least one day")]
    InvalidHorizon,

    #[error("workers disconnected with {pending} categories outstanding")]
    WorkersDisconnected { pending: usize },
}

enum WorkerEvent<M> {
    Finished {
        outcome: Result<TrainOutput<M>, TrainError>,
    },
    Skipped {
        category: Category,
    },
}

/// Per-category training orchestrator.
pub struct ForecastEngine<F: Forecaster> {
    training: TrainingFrame,
    horizon_days: u32,
    holidays: Arc<HolidayCalendar>,
    forecaster: Arc<F>,
    options: EngineOptions,
    models: ModelStore<F::Model>,
    results: ResultStore,
    failures: Vec<CategoryFailure>,
}

impl<F: Forecaster + 'static> ForecastEngine<F> {
    /// Build an engine with default options. The holiday provider is queried
    /// exactly once, here.
    pub fn new(
        training: TrainingFrame,
        horizon_days: u32,
        provider: &dyn HolidayProvider,
        forecaster: F,
    ) -> Result<Self, EngineError> {
        Self::with_options(
            training,
            horizon_days,
            provider,
            forecaster,
            EngineOptions::default(),
        )
    }

    pub fn with_options(
        training: TrainingFrame,
        horizon_days: u32,
        provider: &dyn HolidayProvider,
        forecaster: F,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        if horizon_days == 0 {
            return Err(EngineError::InvalidHorizon);
        }
        let holidays = provider.get_holidays()?;
        tracing::debug!(
            provider = provider.name(),
            holidays = holidays.len(),
            "holiday calendar loaded"
        );
        Ok(Self {
            training,
            horizon_days,
            holidays: Arc::new(holidays),
            forecaster: Arc::new(forecaster),
            options,
            models: ModelStore::new(),
            results: ResultStore::new(),
            failures: Vec::new(),
        })
    }

    /// Train every category and return the forecasts keyed by category.
    ///
    /// Stores are cleared first, so calling this twice retrains from scratch.
    /// Under [`FailurePolicy::FailFast`] the first failure is returned and the
    /// stores hold whatever finished before it.
    pub fn train_all_categories(&mut self) -> Result<&ResultStore, EngineError> {
        self.models.clear();
        self.results.clear();
        self.failures.clear();

        let slices = self.training.split_by_category();
        let total = slices.len();
        if total == 0 {
            tracing::info!("no categories to train");
            return Ok(&self.results);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .thread_name(|i| format!("shelfcast-train-{i}"))
            .build()?;
        tracing::info!(
            categories = total,
            workers = pool.current_num_threads(),
            horizon = self.horizon_days,
            "training started"
        );

        let started_at = Instant::now();
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<WorkerEvent<F::Model>>();

        for (category, rows) in slices {
            let tx = tx.clone();
            let abort = Arc::clone(&abort);
            let forecaster = Arc::clone(&self.forecaster);
            let holidays = Arc::clone(&self.holidays);
            let config = self.options.model_config.clone();
            let horizon = self.horizon_days;
            let timeout = self.options.category_timeout;

            pool.spawn(move || {
                if abort.load(Ordering::Relaxed) {
                    let _ = tx.send(WorkerEvent::Skipped { category });
                    return;
                }
                let outcome = match timeout {
                    None => guarded_train(&*forecaster, &category, &rows, &holidays, &config, horizon),
                    Some(limit) => train_with_deadline(
                        forecaster, category, rows, holidays, config, horizon, limit,
                    ),
                };
                let _ = tx.send(WorkerEvent::Finished { outcome });
            });
        }
        // Only workers hold senders now; a closed channel means they are gone.
        drop(tx);

        let mut outstanding = total;
        while outstanding > 0 {
            let Ok(event) = rx.recv() else {
                return Err(EngineError::WorkersDisconnected {
                    pending: outstanding,
                });
            };
            outstanding -= 1;

            match event {
                WorkerEvent::Skipped { category } => {
                    tracing::debug!(%category, "skipped after abort");
                }
                WorkerEvent::Finished { outcome } => match outcome {
                    Ok(out) => {
                        tracing::debug!(
                            category = %out.category,
                            points = out.forecast.len(),
                            "category finished"
                        );
                        self.models.insert(out.category.clone(), out.model);
                        self.results.insert(out.category, out.forecast);
                    }
                    Err(error) => self.record_failure(error, &abort)?,
                },
            }
        }

        tracing::info!(
            trained = self.results.len(),
            failed = self.failures.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "training finished"
        );
        Ok(&self.results)
    }

    fn record_failure(&mut self, error: TrainError, abort: &AtomicBool) -> Result<(), EngineError> {
        match self.options.failure_policy {
            FailurePolicy::FailFast => {
                abort.store(true, Ordering::Relaxed);
                tracing::warn!(category = error.category(), %error, "aborting batch");
                Err(EngineError::CategoryFailed(error))
            }
            FailurePolicy::Isolate => {
                tracing::warn!(category = error.category(), %error, "category failed");
                self.failures.push(CategoryFailure {
                    category: error.category().to_string(),
                    error,
                });
                Ok(())
            }
        }
    }

    pub fn models(&self) -> &ModelStore<F::Model> {
        &self.models
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Failures captured under [`FailurePolicy::Isolate`], in arrival order.
    pub fn failures(&self) -> &[CategoryFailure] {
        &self.failures
    }

    /// Distinct categories of the training frame.
    pub fn categories(&self) -> BTreeSet<Category> {
        self.training.categories()
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn forecaster(&self) -> &F {
        &self.forecaster
    }
}

/// Train one category, turning a panic into [`TrainError::WorkerPanicked`].
fn guarded_train<F: Forecaster>(
    forecaster: &F,
    category: &str,
    rows: &[TimeSeriesRow],
    holidays: &HolidayCalendar,
    config: &ModelConfig,
    horizon: u32,
) -> Result<TrainOutput<F::Model>, TrainError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        train_category(forecaster, category, rows, holidays, config, horizon)
    }))
    .unwrap_or_else(|payload| {
        Err(TrainError::WorkerPanicked {
            category: category.to_string(),
            message: panic_message(payload.as_ref()),
        })
    })
}

/// Run the fit on a dedicated thread and stop waiting after `limit`.
///
/// The pool slot is released on expiry. The fit thread cannot be cancelled;
/// it runs to completion and its result is dropped.
fn train_with_deadline<F: Forecaster + 'static>(
    forecaster: Arc<F>,
    category: Category,
    rows: Vec<TimeSeriesRow>,
    holidays: Arc<HolidayCalendar>,
    config: ModelConfig,
    horizon: u32,
    limit: Duration,
) -> Result<TrainOutput<F::Model>, TrainError> {
    let (done_tx, done_rx) = mpsc::channel();
    let name = category.clone();
    let spawned = thread::Builder::new()
        .name("shelfcast-fit".into())
        .spawn(move || {
            let outcome = guarded_train(&*forecaster, &name, &rows, &holidays, &config, horizon);
            let _ = done_tx.send(outcome);
        });
    if let Err(e) = spawned {
        return Err(TrainError::WorkerPanicked {
            category,
            message: format!("failed to spawn fit thread: {e}"),
        });
    }

    match done_rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            tracing::debug!(%category, "fit abandoned after timeout");
            Err(TrainError::TimedOut {
                category,
                after: limit,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(TrainError::WorkerPanicked {
            category,
            message: "fit thread exited without a result".into(),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as Days, NaiveDate};
    use shelfcast_core::domain::{SalesFrame, TimeSeriesRow};
    use shelfcast_core::holidays::StaticHolidays;
    use shelfcast_core::model::DecompositionForecaster;

    fn frame(categories: &[&str], days: i64) -> SalesFrame {
        let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        categories
            .iter()
            .flat_map(|c| {
                (0..days).map(move |i| TimeSeriesRow::new(start + Days::days(i), *c, 10.0))
            })
            .collect()
    }

    #[test]
    fn key_set_matches_categories() {
        let mut engine = ForecastEngine::new(
            frame(&["A", "B", "C"], 40),
            7,
            &StaticHolidays::none(),
            DecompositionForecaster,
        )
        .unwrap();
        let keys: Vec<String> = engine.train_all_categories().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
        assert_eq!(engine.models().len(), 3);
        assert!(engine.failures().is_empty());
        assert_eq!(engine.categories().len(), 3);
    }

    #[test]
    fn empty_frame_yields_empty_store() {
        let mut engine = ForecastEngine::new(
            SalesFrame::default(),
            30,
            &StaticHolidays::none(),
            DecompositionForecaster,
        )
        .unwrap();
        assert!(engine.train_all_categories().unwrap().is_empty());
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let result = ForecastEngine::new(
            frame(&["A"], 10),
            0,
            &StaticHolidays::none(),
            DecompositionForecaster,
        );
        assert!(matches!(result, Err(EngineError::InvalidHorizon)));
    }

    #[test]
    fn retraining_clears_previous_stores() {
        let mut engine = ForecastEngine::new(
            frame(&["A", "B"], 30),
            5,
            &StaticHolidays::none(),
            DecompositionForecaster,
        )
        .unwrap();
        engine.train_all_categories().unwrap();
        let first = engine.results().clone();
        engine.train_all_categories().unwrap();
        assert_eq!(engine.results(), &first);
    }

    #[test]
    fn panic_message_handles_both_payload_types() {
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
        let borrowed: Box<dyn std::any::Any + Send> = Box::new("bang");
        assert_eq!(panic_message(owned.as_ref()), "boom");
        assert_eq!(panic_message(borrowed.as_ref()), "bang");
    }

    #[test]
    fn failure_policy_serializes_snake_case() {
        let json = serde_json::to_string(&FailurePolicy::FailFast).unwrap();
        assert_eq!(json, "\"fail_fast\"");
        assert_eq!(FailurePolicy::default(), FailurePolicy::Isolate);
    }
}

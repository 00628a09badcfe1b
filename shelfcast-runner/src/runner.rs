//! Pipeline runner — wires loading, training and evaluation together.
//!
//! Entry points:
//! - `run_from_config()`: loads the sales CSV named in the config, then runs.
//!   Used by the CLI.
//! - `run_with_data()`: takes pre-loaded data and a config. Used for synthetic
//!   runs.
//! - `run_forecast()`: takes pre-loaded data, an explicit holiday provider,
//!   forecaster and engine options. No I/O.

use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shelfcast_core::holidays::{CsvHolidayProvider, HolidayProvider, StaticHolidays};
use shelfcast_core::model::{DecompositionForecaster, Forecaster};

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{load_sales_csv, split_frames, CleaningStats, LoadError, LoadedData};
use crate::engine::{EngineError, EngineOptions, FailurePolicy, ForecastEngine, ResultStore};
use crate::evaluate::{calculate_metrics, MetricsFrame};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("no training rows on or before {cutoff}")]
    EmptyTraining { cutoff: NaiveDate },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// A category that produced no forecast, flattened for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub category: String,
    pub kind: String,
    pub message: String,
}

/// Summary of one forecasting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub forecaster: String,
    pub train_end_date: NaiveDate,
    pub forecast_horizon: u32,
    pub failure_policy: FailurePolicy,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub cleaning: CleaningStats,
    pub training_rows: usize,
    pub validation_rows: usize,
    pub categories_total: usize,
    pub categories_trained: usize,
    /// `None` when validation actuals sum to zero.
    pub global_wmape: Option<f64>,
    pub metrics: MetricsFrame,
    pub failures: Vec<FailureRecord>,
    pub elapsed_secs: f64,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Report plus the forecasts it was computed from.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub forecasts: ResultStore,
}

/// Load the sales file named by `config` and run the pipeline.
pub fn run_from_config(config: &PipelineConfig) -> Result<RunOutcome, RunError> {
    config.validate()?;
    let loaded = load_sales_csv(&config.data.train_csv, &config.data.columns)?;
    run_with_data(config, &loaded)
}

/// Run the pipeline on pre-loaded data with the default model.
pub fn run_with_data(config: &PipelineConfig, loaded: &LoadedData) -> Result<RunOutcome, RunError> {
    let provider: Box<dyn HolidayProvider> = match &config.data.holidays_csv {
        Some(path) => Box::new(CsvHolidayProvider::new(path)),
        None => Box::new(StaticHolidays::none()),
    };
    run_forecast(
        loaded,
        config.split.train_end_date,
        config.split.forecast_horizon,
        provider.as_ref(),
        DecompositionForecaster,
        config.engine_options(),
    )
}

/// Split, train every category and score against the validation window.
pub fn run_forecast<F: Forecaster + 'static>(
    loaded: &LoadedData,
    train_end_date: NaiveDate,
    horizon_days: u32,
    provider: &dyn HolidayProvider,
    forecaster: F,
    options: EngineOptions,
) -> Result<RunOutcome, RunError> {
    let started = Instant::now();
    let (training, validation) = split_frames(loaded.rows.clone(), train_end_date, horizon_days);
    if training.is_empty() {
        return Err(RunError::EmptyTraining {
            cutoff: train_end_date,
        });
    }
    if validation.is_empty() {
        tracing::warn!(%train_end_date, horizon_days, "validation window is empty");
    }

    let training_rows = training.len();
    let validation_rows = validation.len();
    let failure_policy = options.failure_policy;
    let forecaster_name = forecaster.name().to_string();

    let mut engine =
        ForecastEngine::with_options(training, horizon_days, provider, forecaster, options)?;
    let categories_total = engine.categories().len();
    let forecasts = engine.train_all_categories()?.clone();
    let (global_wmape, metrics) = calculate_metrics(&forecasts, &validation);

    let failures = engine
        .failures()
        .iter()
        .map(|f| FailureRecord {
            category: f.category.clone(),
            kind: f.error.kind().to_string(),
            message: f.error.to_string(),
        })
        .collect();

    let report = RunReport {
        schema_version: SCHEMA_VERSION,
        forecaster: forecaster_name,
        train_end_date,
        forecast_horizon: horizon_days,
        failure_policy,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        cleaning: loaded.stats,
        training_rows,
        validation_rows,
        categories_total,
        categories_trained: forecasts.len(),
        global_wmape,
        metrics,
        failures,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };

    tracing::info!(
        categories = report.categories_trained,
        failed = report.failures.len(),
        global_wmape = ?report.global_wmape,
        "run complete"
    );
    Ok(RunOutcome { report, forecasts })
}

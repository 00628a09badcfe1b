//! Per-category trainer: one category's history in, fitted model and forecast out.
//!
//! The trainer owns its slice of rows and touches no shared state apart from
//! the read-only holiday calendar, so any number of trainers can run at once.

use std::fmt;
use std::time::Duration;

use chrono::Datelike;
use shelfcast_core::domain::{Category, ForecastResult, TimeSeriesRow};
use shelfcast_core::holidays::{regional_holidays, HolidayCalendar};
use shelfcast_core::model::{FitError, FittedModel, Forecaster, ModelConfig, Series};
use thiserror::Error;

/// Per-category training failure. Every variant carries the category.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("category '{category}': no usable training rows")]
    DataInsufficient { category: Category },

    #[error("category '{category}': fit failed: {source}")]
    FitFailure {
        category: Category,
        #[source]
        source: FitError,
    },

    #[error("category '{category}': timed out after {after:?}")]
    TimedOut { category: Category, after: Duration },

    #[error("category '{category}': worker panicked: {message}")]
    WorkerPanicked { category: Category, message: String },
}

/// Short machine-readable tag for a [`TrainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainErrorKind {
    DataInsufficient,
    FitFailure,
    TimedOut,
    WorkerPanicked,
}

impl TrainErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataInsufficient => "data_insufficient",
            Self::FitFailure => "fit_failure",
            Self::TimedOut => "timed_out",
            Self::WorkerPanicked => "worker_panicked",
        }
    }
}

impl fmt::Display for TrainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TrainError {
    pub fn category(&self) -> &str {
        match self {
            Self::DataInsufficient { category }
            | Self::FitFailure { category, .. }
            | Self::TimedOut { category, .. }
            | Self::WorkerPanicked { category, .. } => category,
        }
    }

    pub fn kind(&self) -> TrainErrorKind {
        match self {
            Self::DataInsufficient { .. } => TrainErrorKind::DataInsufficient,
            Self::FitFailure { .. } => TrainErrorKind::FitFailure,
            Self::TimedOut { .. } => TrainErrorKind::TimedOut,
            Self::WorkerPanicked { .. } => TrainErrorKind::WorkerPanicked,
        }
    }
}

/// Output of one successful training: `(category, model, forecast)`.
#[derive(Debug, Clone)]
pub struct TrainOutput<M> {
    pub category: Category,
    pub model: M,
    pub forecast: ForecastResult,
}

/// Fit one category and forecast `horizon_days` past its last observation.
///
/// Rows belonging to other categories and rows with invalid values are
/// ignored. When `config.country_holidays` is set, that regional set is merged
/// into `holidays` for every year touched by history and horizon.
pub fn train_category<F: Forecaster>(
    forecaster: &F,
    category: &str,
    rows: &[TimeSeriesRow],
    holidays: &HolidayCalendar,
    config: &ModelConfig,
    horizon_days: u32,
) -> Result<TrainOutput<F::Model>, TrainError> {
    let own: Vec<TimeSeriesRow> = rows
        .iter()
        .filter(|r| r.category == category && r.is_valid())
        .cloned()
        .collect();
    let series = Series::from_rows(&own);
    let (first, last) = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(TrainError::DataInsufficient {
                category: category.to_string(),
            })
        }
    };

    let fit_failure = |source: FitError| TrainError::FitFailure {
        category: category.to_string(),
        source,
    };

    let calendar = match &config.country_holidays {
        Some(country) => {
            let horizon_end = last + chrono::Duration::days(i64::from(horizon_days));
            let regional = regional_holidays(country, first.year()..=horizon_end.year())
                .map_err(|e| fit_failure(FitError::InvalidConfig(e.to_string())))?;
            holidays.merged(&regional)
        }
        None => holidays.clone(),
    };

    let model = forecaster
        .fit(&series, &calendar, config)
        .map_err(fit_failure)?;
    let dates = model.make_future_dates(horizon_days);
    let points = model.predict(&dates).map_err(fit_failure)?;

    tracing::debug!(
        category,
        history = series.len(),
        horizon = horizon_days,
        "category trained"
    );

    Ok(TrainOutput {
        category: category.to_string(),
        model,
        forecast: ForecastResult::new(category, points, series.len()),
    })
}

//! Forecasting model seam.
//!
//! The orchestrator only relies on the [`Forecaster`] / [`FittedModel`]
//! contract: fit a per-day value series with a holiday calendar and a config,
//! then predict over a list of dates. Any model family can be plugged in
//! without touching orchestration or evaluation.

pub mod config;
pub mod decomposition;
mod linalg;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::domain::{ForecastPoint, TimeSeriesRow};
use crate::holidays::HolidayCalendar;

pub use config::{ModelConfig, SeasonalityMode};
pub use decomposition::{DecompositionForecaster, DecompositionModel};

/// Errors raised while fitting or predicting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("cannot fit an empty series")]
    EmptySeries,

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("non-finite values in {0}")]
    NonFinite(String),

    #[error("{component} fit did not converge (singular system)")]
    Singular { component: &'static str },

    #[error("{0}")]
    Other(String),
}

/// Daily (timestamp, value) series, one value per date, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    /// Build from rows; values sharing a date are summed.
    pub fn from_rows(rows: &[TimeSeriesRow]) -> Self {
        Self::from_points(rows.iter().map(|r| (r.date, r.value)))
    }

    pub fn from_points<I: IntoIterator<Item = (NaiveDate, f64)>>(points: I) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, value) in points {
            *by_date.entry(date).or_insert(0.0) += value;
        }
        let (dates, values) = by_date.into_iter().unzip();
        Self { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// A model family that can be fitted to one series.
pub trait Forecaster: Send + Sync {
    type Model: FittedModel;

    /// Human-readable name of this model family.
    fn name(&self) -> &str;

    fn fit(
        &self,
        series: &Series,
        holidays: &HolidayCalendar,
        config: &ModelConfig,
    ) -> Result<Self::Model, FitError>;
}

/// A fitted model handle.
pub trait FittedModel: Send + Sync + 'static {
    /// Dates the model was fitted on, ascending.
    fn history_dates(&self) -> &[NaiveDate];

    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>, FitError>;

    /// History dates followed by `horizon_days` consecutive calendar days
    /// after the last observed date.
    fn make_future_dates(&self, horizon_days: u32) -> Vec<NaiveDate> {
        let history = self.history_dates();
        let mut dates = Vec::with_capacity(history.len() + horizon_days as usize);
        dates.extend_from_slice(history);
        if let Some(&last) = history.last() {
            dates.extend((1..=i64::from(horizon_days)).map(|i| last + Duration::days(i)));
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    #[test]
    fn series_sums_duplicate_dates() {
        let rows = vec![
            TimeSeriesRow::new(d(2), "PRODUCE", 4.0),
            TimeSeriesRow::new(d(1), "PRODUCE", 1.0),
            TimeSeriesRow::new(d(2), "PRODUCE", 6.0),
        ];
        let series = Series::from_rows(&rows);
        assert_eq!(series.dates(), &[d(1), d(2)]);
        assert_eq!(series.values(), &[1.0, 10.0]);
    }

    struct Fixed(Vec<NaiveDate>);

    impl FittedModel for Fixed {
        fn history_dates(&self) -> &[NaiveDate] {
            &self.0
        }

        fn predict(&self, _dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>, FitError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn future_dates_extend_by_calendar_days() {
        // gap in history must not shift the future window
        let model = Fixed(vec![d(1), d(2), d(5)]);
        let dates = model.make_future_dates(3);
        assert_eq!(dates, vec![d(1), d(2), d(5), d(6), d(7), d(8)]);
    }

    #[test]
    fn zero_horizon_is_history_only() {
        let model = Fixed(vec![d(1), d(2)]);
        assert_eq!(model.make_future_dates(0), vec![d(1), d(2)]);
    }
}

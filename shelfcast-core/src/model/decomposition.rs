//! Default model: trend × seasonality × holidays decomposition.
//!
//! - Trend: piecewise-linear with changepoints spread over the first
//!   `changepoint_range` of history. Slope changes are ridge-penalized by
//!   `1 / changepoint_prior_scale²`, so small scales give a stiff trend.
//! - Seasonality: Fourier terms for the weekly (period 7) and yearly
//!   (period 365.25) cycles on absolute day numbers.
//! - Holidays: one indicator per holiday name seen in history.
//!
//! Seasonal and holiday effects are fitted on the detrended signal, either as
//! a ratio (`Multiplicative`) or a difference (`Additive`). Values are scaled
//! by the series maximum during fitting. Predictions are clipped at zero.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

use super::linalg::{normal_quantile, ridge_solve};
use super::{FitError, FittedModel, Forecaster, ModelConfig, SeasonalityMode, Series};
use crate::domain::ForecastPoint;
use crate::holidays::HolidayCalendar;

const WEEKLY_PERIOD: f64 = 7.0;
const YEARLY_PERIOD: f64 = 365.25;

/// Tiny ridge on intercept and base slope keeps the system positive definite.
const BASE_PENALTY: f64 = 1e-6;

/// Below this scaled trend level the ratio to trend is not informative.
const MIN_TREND_FOR_RATIO: f64 = 1e-6;

/// Stateless factory for [`DecompositionModel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecompositionForecaster;

impl Forecaster for DecompositionForecaster {
    type Model = DecompositionModel;

    fn name(&self) -> &str {
        "decomposition"
    }

    fn fit(
        &self,
        series: &Series,
        holidays: &HolidayCalendar,
        config: &ModelConfig,
    ) -> Result<DecompositionModel, FitError> {
        DecompositionModel::fit(series, holidays, config)
    }
}

/// Seasonal/holiday feature layout shared by fitting and prediction.
#[derive(Debug, Clone)]
struct Features {
    weekly_order: usize,
    yearly_order: usize,
    holiday_names: Vec<String>,
    holidays_by_date: BTreeMap<NaiveDate, Vec<usize>>,
}

impl Features {
    fn new(config: &ModelConfig, holidays: &HolidayCalendar, history: &[NaiveDate]) -> Self {
        let weekly_order = if config.weekly_seasonality {
            config.weekly_fourier_order
        } else {
            0
        };
        let yearly_order = if config.yearly_seasonality {
            config.yearly_fourier_order
        } else {
            0
        };

        // Only names that occur in history can be estimated.
        let history_set: BTreeSet<NaiveDate> = history.iter().copied().collect();
        let seen: BTreeSet<&str> = holidays
            .iter()
            .filter(|h| history_set.contains(&h.date))
            .map(|h| h.name.as_str())
            .collect();
        let holiday_names: Vec<String> = seen.iter().map(|s| s.to_string()).collect();

        let mut holidays_by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for h in holidays.iter() {
            if let Ok(idx) = holiday_names.binary_search(&h.name) {
                holidays_by_date.entry(h.date).or_default().push(idx);
            }
        }

        Self {
            weekly_order,
            yearly_order,
            holiday_names,
            holidays_by_date,
        }
    }

    fn width(&self) -> usize {
        2 * self.weekly_order + 2 * self.yearly_order + self.holiday_names.len()
    }

    fn row(&self, date: NaiveDate) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        let t = f64::from(date.num_days_from_ce());
        fourier(t, WEEKLY_PERIOD, self.weekly_order, &mut out);
        fourier(t, YEARLY_PERIOD, self.yearly_order, &mut out);
        let active = self.holidays_by_date.get(&date);
        for idx in 0..self.holiday_names.len() {
            let on = active.is_some_and(|v| v.contains(&idx));
            out.push(if on { 1.0 } else { 0.0 });
        }
        out
    }

    fn penalty(&self, config: &ModelConfig) -> Vec<f64> {
        let seasonal = 1.0 / (config.seasonality_prior_scale * config.seasonality_prior_scale);
        let holiday = 1.0 / (config.holidays_prior_scale * config.holidays_prior_scale);
        let n_seasonal = 2 * self.weekly_order + 2 * self.yearly_order;
        let mut out = vec![seasonal; n_seasonal];
        out.extend(std::iter::repeat(holiday).take(self.holiday_names.len()));
        out
    }
}

fn fourier(t: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let x = 2.0 * PI * k as f64 * t / period;
        out.push(x.sin());
        out.push(x.cos());
    }
}

/// Fitted decomposition model for one series.
#[derive(Debug, Clone)]
pub struct DecompositionModel {
    mode: SeasonalityMode,
    history: Vec<NaiveDate>,
    origin: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    /// `[offset, slope, delta_1, .., delta_k]` in scaled units.
    trend_coef: Vec<f64>,
    features: Features,
    seasonal_coef: Vec<f64>,
    sigma: f64,
    z: f64,
}

impl DecompositionModel {
    pub fn fit(
        series: &Series,
        holidays: &HolidayCalendar,
        config: &ModelConfig,
    ) -> Result<Self, FitError> {
        config.validate()?;
        if series.is_empty() {
            return Err(FitError::EmptySeries);
        }
        if series.values().iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("input series".into()));
        }

        let dates = series.dates().to_vec();
        let n = dates.len();
        let origin = dates[0];
        let span_days = ((dates[n - 1] - origin).num_days() as f64).max(1.0);
        let y_max = series.values().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };
        let ys: Vec<f64> = series.values().iter().map(|v| v / y_scale).collect();
        let ts: Vec<f64> = dates
            .iter()
            .map(|d| (*d - origin).num_days() as f64 / span_days)
            .collect();

        // ── Trend ──
        let changepoints = place_changepoints(&ts, config);
        let trend_rows: Vec<Vec<f64>> = ts.iter().map(|&t| trend_row(t, &changepoints)).collect();
        let cp_penalty =
            1.0 / (config.changepoint_prior_scale * config.changepoint_prior_scale);
        let mut penalty = vec![BASE_PENALTY, BASE_PENALTY];
        penalty.extend(std::iter::repeat(cp_penalty).take(changepoints.len()));
        let trend_coef = ridge_solve(&trend_rows, &ys, &penalty)
            .ok_or(FitError::Singular { component: "trend" })?;
        let trend: Vec<f64> = trend_rows.iter().map(|row| dot(row, &trend_coef)).collect();

        // ── Seasonality + holidays on the detrended signal ──
        let features = Features::new(config, holidays, &dates);
        let width = features.width();
        let seasonal_coef = if width == 0 {
            Vec::new()
        } else {
            let mut rows = Vec::with_capacity(n);
            let mut targets = Vec::with_capacity(n);
            for ((date, &y), &tr) in dates.iter().zip(&ys).zip(&trend) {
                let target = match config.seasonality_mode {
                    SeasonalityMode::Additive => y - tr,
                    SeasonalityMode::Multiplicative => {
                        if tr.abs() < MIN_TREND_FOR_RATIO {
                            continue;
                        }
                        y / tr - 1.0
                    }
                };
                rows.push(features.row(*date));
                targets.push(target);
            }
            if rows.is_empty() {
                vec![0.0; width]
            } else {
                ridge_solve(&rows, &targets, &features.penalty(config))
                    .ok_or(FitError::Singular { component: "seasonality" })?
            }
        };

        let mut model = Self {
            mode: config.seasonality_mode,
            history: dates,
            origin,
            span_days,
            y_scale,
            changepoints,
            trend_coef,
            features,
            seasonal_coef,
            sigma: 0.0,
            z: normal_quantile(0.5 + config.interval_width / 2.0),
        };

        // Residual spread for the uncertainty band.
        let sse: f64 = model
            .history
            .iter()
            .zip(&ys)
            .map(|(date, &y)| {
                let (_, yhat) = model.components_scaled(*date);
                (y - yhat).powi(2)
            })
            .sum();
        model.sigma = (sse / n as f64).sqrt();

        if !model.sigma.is_finite() {
            return Err(FitError::NonFinite("residuals".into()));
        }
        Ok(model)
    }

    pub fn mode(&self) -> SeasonalityMode {
        self.mode
    }

    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    /// Holiday names with a fitted effect.
    pub fn holiday_names(&self) -> &[String] {
        &self.features.holiday_names
    }

    /// In-sample residual standard deviation, in original units.
    pub fn residual_sigma(&self) -> f64 {
        self.sigma * self.y_scale
    }

    /// Trend level on `date`, in original units.
    pub fn trend_at(&self, date: NaiveDate) -> f64 {
        self.trend_scaled(date) * self.y_scale
    }

    /// Combined seasonal + holiday term on `date`: a relative change in
    /// multiplicative mode, an absolute one in additive mode.
    pub fn seasonal_effect(&self, date: NaiveDate) -> f64 {
        let effect = self.seasonal_scaled(date);
        match self.mode {
            SeasonalityMode::Multiplicative => effect,
            SeasonalityMode::Additive => effect * self.y_scale,
        }
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64 / self.span_days
    }

    fn trend_scaled(&self, date: NaiveDate) -> f64 {
        dot(&trend_row(self.scaled_time(date), &self.changepoints), &self.trend_coef)
    }

    fn seasonal_scaled(&self, date: NaiveDate) -> f64 {
        if self.seasonal_coef.is_empty() {
            return 0.0;
        }
        dot(&self.features.row(date), &self.seasonal_coef)
    }

    /// (trend, yhat) in scaled units, before clipping.
    fn components_scaled(&self, date: NaiveDate) -> (f64, f64) {
        let trend = self.trend_scaled(date);
        let seasonal = self.seasonal_scaled(date);
        let yhat = match self.mode {
            SeasonalityMode::Additive => trend + seasonal,
            SeasonalityMode::Multiplicative => trend * (1.0 + seasonal),
        };
        (trend, yhat)
    }
}

impl FittedModel for DecompositionModel {
    fn history_dates(&self) -> &[NaiveDate] {
        &self.history
    }

    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>, FitError> {
        let half_band = self.z * self.sigma;
        dates
            .iter()
            .map(|&date| {
                let (trend, yhat) = self.components_scaled(date);
                if !yhat.is_finite() {
                    return Err(FitError::NonFinite(format!("prediction for {date}")));
                }
                Ok(ForecastPoint {
                    date,
                    yhat: yhat.max(0.0) * self.y_scale,
                    yhat_lower: (yhat - half_band).max(0.0) * self.y_scale,
                    yhat_upper: (yhat + half_band).max(0.0) * self.y_scale,
                    trend: trend * self.y_scale,
                })
            })
            .collect()
    }
}

/// Evenly spaced changepoints over the first `changepoint_range` of history.
fn place_changepoints(ts: &[f64], config: &ModelConfig) -> Vec<f64> {
    let hist = ((ts.len() as f64) * config.changepoint_range).floor() as usize;
    let count = config.n_changepoints.min(hist.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    let mut out: Vec<f64> = (1..=count)
        .map(|i| {
            let idx = ((i * (hist - 1)) as f64 / count as f64).round() as usize;
            ts[idx]
        })
        .collect();
    out.dedup();
    out
}

fn trend_row(t: f64, changepoints: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
    row
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

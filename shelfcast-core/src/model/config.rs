//! Model hyperparameters.

use serde::{Deserialize, Serialize};

use super::FitError;

/// How seasonal and holiday effects combine with the trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// `yhat = trend + seasonal`
    #[default]
    Additive,
    /// `yhat = trend * (1 + seasonal)`
    Multiplicative,
}

/// Hyperparameters handed to a [`Forecaster`](super::Forecaster).
///
/// `daily_seasonality` models cycles within a day. Series here carry one
/// value per day, so enabling it adds no signal and models ignore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub seasonality_mode: SeasonalityMode,
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    pub daily_seasonality: bool,
    /// Trend flexibility. Smaller values give a stiffer trend.
    pub changepoint_prior_scale: f64,
    pub n_changepoints: usize,
    /// Fraction of history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub seasonality_prior_scale: f64,
    pub holidays_prior_scale: f64,
    pub yearly_fourier_order: usize,
    pub weekly_fourier_order: usize,
    /// ISO country code of a built-in regional holiday set added on top of
    /// the injected calendar.
    pub country_holidays: Option<String>,
    /// Coverage of the `yhat_lower..yhat_upper` band.
    pub interval_width: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seasonality_mode: SeasonalityMode::Additive,
            yearly_seasonality: true,
            weekly_seasonality: true,
            daily_seasonality: false,
            changepoint_prior_scale: 0.05,
            n_changepoints: 25,
            changepoint_range: 0.8,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            yearly_fourier_order: 10,
            weekly_fourier_order: 3,
            country_holidays: None,
            interval_width: 0.8,
        }
    }
}

impl ModelConfig {
    /// Fixed retail policy applied to every category: multiplicative
    /// seasonality, yearly + weekly on, daily off, conservative changepoints
    /// and Ecuadorian national holidays on top of the injected calendar.
    pub fn retail() -> Self {
        Self {
            seasonality_mode: SeasonalityMode::Multiplicative,
            yearly_seasonality: true,
            weekly_seasonality: true,
            daily_seasonality: false,
            changepoint_prior_scale: 0.05,
            country_holidays: Some("EC".to_string()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.changepoint_prior_scale.is_finite() && self.changepoint_prior_scale > 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "changepoint_prior_scale must be positive, got {}",
                self.changepoint_prior_scale
            )));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(FitError::InvalidConfig(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        for (name, value) in [
            ("seasonality_prior_scale", self.seasonality_prior_scale),
            ("holidays_prior_scale", self.holidays_prior_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(FitError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(FitError::InvalidConfig(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        Ok(())
    }
}

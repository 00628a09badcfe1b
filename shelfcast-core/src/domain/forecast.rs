//! Forecast output — one ordered series of predictions per category.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::row::Category;

/// Prediction for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
}

/// Forecast for one category covering the fitted history plus the horizon.
///
/// Points are in ascending date order. The value is immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    category: Category,
    points: Vec<ForecastPoint>,
    history_len: usize,
}

impl ForecastResult {
    /// `history_len` is the number of leading points that fall inside the
    /// fitted window; the rest are future dates.
    pub fn new(category: impl Into<Category>, mut points: Vec<ForecastPoint>, history_len: usize) -> Self {
        points.sort_by_key(|p| p.date);
        let history_len = history_len.min(points.len());
        Self {
            category: category.into(),
            points,
            history_len,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn history(&self) -> &[ForecastPoint] {
        &self.points[..self.history_len]
    }

    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len..]
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Point prediction for `date`, if the forecast covers it.
    pub fn prediction_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].yhat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, yhat: f64) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2017, 7, day).unwrap(),
            yhat,
            yhat_lower: yhat - 1.0,
            yhat_upper: yhat + 1.0,
            trend: yhat,
        }
    }

    #[test]
    fn history_and_future_split() {
        let result = ForecastResult::new(
            "BREAD/BAKERY",
            vec![point(3, 3.0), point(1, 1.0), point(2, 2.0)],
            2,
        );
        assert_eq!(result.len(), 3);
        assert_eq!(result.history().len(), 2);
        assert_eq!(result.future().len(), 1);
        assert_eq!(result.future()[0].yhat, 3.0);
    }

    #[test]
    fn prediction_lookup_by_date() {
        let result = ForecastResult::new("DAIRY", vec![point(1, 1.0), point(2, 2.0)], 1);
        assert_eq!(
            result.prediction_on(NaiveDate::from_ymd_opt(2017, 7, 2).unwrap()),
            Some(2.0)
        );
        assert_eq!(
            result.prediction_on(NaiveDate::from_ymd_opt(2017, 7, 9).unwrap()),
            None
        );
    }

    #[test]
    fn history_len_is_clamped() {
        let result = ForecastResult::new("EGGS", vec![point(1, 1.0)], 10);
        assert_eq!(result.history().len(), 1);
        assert!(result.future().is_empty());
    }
}

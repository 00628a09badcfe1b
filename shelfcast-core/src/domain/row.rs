//! TimeSeriesRow — one observed value for one category on one day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category identifier (a product family).
pub type Category = String;

/// A single (date, category, value) observation.
///
/// Both the training and the validation frame are built from these rows, so
/// the loader and the trainer share one typed schema instead of agreeing on
/// column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    pub category: Category,
    pub value: f64,
}

impl TimeSeriesRow {
    pub fn new(date: NaiveDate, category: impl Into<Category>, value: f64) -> Self {
        Self {
            date,
            category: category.into(),
            value,
        }
    }

    /// Finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 7, d).unwrap()
    }

    #[test]
    fn valid_row() {
        assert!(TimeSeriesRow::new(day(1), "GROCERY I", 12.5).is_valid());
        assert!(TimeSeriesRow::new(day(1), "GROCERY I", 0.0).is_valid());
    }

    #[test]
    fn negative_and_nan_rows_are_invalid() {
        assert!(!TimeSeriesRow::new(day(1), "BEVERAGES", -1.0).is_valid());
        assert!(!TimeSeriesRow::new(day(1), "BEVERAGES", f64::NAN).is_valid());
        assert!(!TimeSeriesRow::new(day(1), "BEVERAGES", f64::INFINITY).is_valid());
    }
}

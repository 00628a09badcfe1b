//! Sales frames — ordered row collections split at a cutoff date.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::row::{Category, TimeSeriesRow};

/// Ordered sequence of rows, sorted by (date, category).
///
/// Frames are built once and never mutated afterwards; per-category work
/// receives copies of the relevant rows via [`SalesFrame::split_by_category`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesFrame {
    rows: Vec<TimeSeriesRow>,
}

/// Rows on or before the training cutoff.
pub type TrainingFrame = SalesFrame;

/// Rows after the cutoff, bounded by cutoff + horizon.
pub type ValidationFrame = SalesFrame;

impl SalesFrame {
    pub fn from_rows(mut rows: Vec<TimeSeriesRow>) -> Self {
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.category.cmp(&b.category)));
        Self { rows }
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct categories present in the frame.
    pub fn categories(&self) -> BTreeSet<Category> {
        self.rows.iter().map(|r| r.category.clone()).collect()
    }

    /// Owned copy of one category's rows, in date order.
    pub fn category_slice(&self, category: &str) -> Vec<TimeSeriesRow> {
        self.rows
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    /// Partition the frame into one owned row vector per category.
    pub fn split_by_category(&self) -> BTreeMap<Category, Vec<TimeSeriesRow>> {
        let mut out: BTreeMap<Category, Vec<TimeSeriesRow>> = BTreeMap::new();
        for row in &self.rows {
            out.entry(row.category.clone()).or_default().push(row.clone());
        }
        out
    }

    /// First and last date in the frame.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.date, self.rows.last()?.date))
    }

    /// Split into (training, validation) at `cutoff`.
    ///
    /// Training keeps `date <= cutoff`. Validation keeps
    /// `cutoff < date <= cutoff + horizon_days`, so nothing past the forecast
    /// horizon is ever scored.
    pub fn split_at(&self, cutoff: NaiveDate, horizon_days: u32) -> (TrainingFrame, ValidationFrame) {
        let limit = cutoff + Duration::days(i64::from(horizon_days));
        let mut training = Vec::new();
        let mut validation = Vec::new();
        for row in &self.rows {
            if row.date <= cutoff {
                training.push(row.clone());
            } else if row.date <= limit {
                validation.push(row.clone());
            }
        }
        (Self { rows: training }, Self { rows: validation })
    }
}

impl FromIterator<TimeSeriesRow> for SalesFrame {
    fn from_iter<I: IntoIterator<Item = TimeSeriesRow>>(iter: I) -> Self {
        Self::from_rows(iter.into_iter().collect())
    }
}

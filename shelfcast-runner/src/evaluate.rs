//! Aggregate accuracy evaluation (WMAPE).
//!
//! Forecasts are inner-joined with validation actuals on date, per category.
//! The global score pools absolute errors and actuals across categories, so
//! high-volume categories weigh in proportion to their sales:
//!
//! ```text
//! WMAPE(c)   = Σ_d |actual - predicted| / Σ_d actual
//! GlobalWMAPE = Σ_c abs_error_sum(c) / Σ_c actual_sum(c)
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shelfcast_core::domain::{Category, ValidationFrame};

use crate::engine::ResultStore;

/// One row of the metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub category: Category,
    /// `None` when the category sold nothing over the aligned dates.
    pub wmape: Option<f64>,
    pub abs_error_sum: f64,
    pub actual_sum: f64,
    pub aligned_dates: usize,
}

/// Why a category has no row in the metrics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Forecast exists but validation has no rows for the category.
    NotInValidation,
    /// Both sides exist but share no date.
    AlignmentEmpty,
    /// Validation has rows but no forecast was produced.
    NotForecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub category: Category,
    pub reason: ExclusionReason,
}

/// Per-category metrics ranked best first, plus excluded categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsFrame {
    rows: Vec<CategoryMetrics>,
    excluded: Vec<Exclusion>,
}

impl MetricsFrame {
    /// Rank rows ascending by WMAPE; undefined last, ties by category.
    pub fn new(mut rows: Vec<CategoryMetrics>, mut excluded: Vec<Exclusion>) -> Self {
        rows.sort_by(rank_order);
        excluded.sort_by(|a, b| a.category.cmp(&b.category));
        Self { rows, excluded }
    }

    pub fn rows(&self) -> &[CategoryMetrics] {
        &self.rows
    }

    /// The `n` best-performing categories.
    pub fn top(&self, n: usize) -> &[CategoryMetrics] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn get(&self, category: &str) -> Option<&CategoryMetrics> {
        self.rows.iter().find(|r| r.category == category)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn excluded(&self) -> &[Exclusion] {
        &self.excluded
    }

    pub fn abs_error_sum(&self) -> f64 {
        self.rows.iter().map(|r| r.abs_error_sum).sum()
    }

    pub fn actual_sum(&self) -> f64 {
        self.rows.iter().map(|r| r.actual_sum).sum()
    }

    /// Pooled WMAPE over all rows.
    pub fn global_wmape(&self) -> Option<f64> {
        global_wmape(&self.rows)
    }
}

fn rank_order(a: &CategoryMetrics, b: &CategoryMetrics) -> Ordering {
    match (a.wmape, b.wmape) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.category.cmp(&b.category))
}

/// `numerator / denominator`, undefined when nothing was sold.
pub fn wmape(abs_error_sum: f64, actual_sum: f64) -> Option<f64> {
    if actual_sum > 0.0 {
        Some(abs_error_sum / actual_sum)
    } else {
        None
    }
}

/// Σ abs-error-sums / Σ actual-sums. Never the mean of per-category scores.
pub fn global_wmape(rows: &[CategoryMetrics]) -> Option<f64> {
    let (num, den) = rows.iter().fold((0.0, 0.0), |(n, d), r| {
        (n + r.abs_error_sum, d + r.actual_sum)
    });
    wmape(num, den)
}

/// Score forecasts against validation actuals.
///
/// Categories present on only one side, or sharing no date, are listed in
/// [`MetricsFrame::excluded`] and contribute nothing to the global score.
/// Actual values sharing a date within a category are summed before joining.
pub fn calculate_metrics(
    results: &ResultStore,
    validation: &ValidationFrame,
) -> (Option<f64>, MetricsFrame) {
    let mut actuals: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for row in validation.rows() {
        *actuals
            .entry(row.category.as_str())
            .or_default()
            .entry(row.date)
            .or_insert(0.0) += row.value;
    }

    let mut rows = Vec::new();
    let mut excluded = Vec::new();

    for (category, forecast) in results {
        let Some(by_date) = actuals.get(category.as_str()) else {
            excluded.push(Exclusion {
                category: category.clone(),
                reason: ExclusionReason::NotInValidation,
            });
            continue;
        };

        let mut abs_error_sum = 0.0;
        let mut actual_sum = 0.0;
        let mut aligned_dates = 0;
        for (&date, &actual) in by_date {
            if let Some(predicted) = forecast.prediction_on(date) {
                abs_error_sum += (actual - predicted).abs();
                actual_sum += actual;
                aligned_dates += 1;
            }
        }

        if aligned_dates == 0 {
            tracing::debug!(%category, "no overlapping dates, excluded");
            excluded.push(Exclusion {
                category: category.clone(),
                reason: ExclusionReason::AlignmentEmpty,
            });
            continue;
        }

        rows.push(CategoryMetrics {
            category: category.clone(),
            wmape: wmape(abs_error_sum, actual_sum),
            abs_error_sum,
            actual_sum,
            aligned_dates,
        });
    }

    for category in actuals.keys() {
        if !results.contains_key(*category) {
            excluded.push(Exclusion {
                category: category.to_string(),
                reason: ExclusionReason::NotForecast,
            });
        }
    }

    let frame = MetricsFrame::new(rows, excluded);
    (frame.global_wmape(), frame)
}

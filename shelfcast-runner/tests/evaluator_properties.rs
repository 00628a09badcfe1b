//! Property tests for the WMAPE evaluator.
//!
//! Uses proptest to verify:
//! 1. Order invariance — shuffling validation rows does not change the score
//! 2. Pooling — global = Σ abs errors / Σ actuals over the table rows
//! 3. Bounds — global lies between the best and worst category WMAPE
//! 4. Zero only on exact matches

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use shelfcast_core::domain::{ForecastPoint, ForecastResult, SalesFrame, TimeSeriesRow};
use shelfcast_runner::{calculate_metrics, ResultStore};

// ── Strategies (proptest) ────────────────────────────────────────────

const HORIZON: usize = 10;

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 7, 16).unwrap() + Duration::days(i as i64)
}

/// Per category: (actuals, predictions) over the horizon.
fn arb_case() -> impl Strategy<Value = Vec<(Vec<f64>, Vec<f64>)>> {
    let values = prop::collection::vec((1.0..1000.0_f64).prop_map(|v| v.round()), HORIZON);
    prop::collection::vec((values.clone(), values), 1..8)
}

fn build(case: &[(Vec<f64>, Vec<f64>)]) -> (ResultStore, Vec<TimeSeriesRow>) {
    let mut results = ResultStore::new();
    let mut rows = Vec::new();
    for (c, (actual, predicted)) in case.iter().enumerate() {
        let category = format!("CAT_{c:02}");
        let points = predicted
            .iter()
            .enumerate()
            .map(|(i, &p)| ForecastPoint {
                date: day(i),
                yhat: p,
                yhat_lower: p,
                yhat_upper: p,
                trend: p,
            })
            .collect();
        results.insert(category.clone(), ForecastResult::new(category.clone(), points, 0));
        rows.extend(
            actual
                .iter()
                .enumerate()
                .map(|(i, &a)| TimeSeriesRow::new(day(i), category.clone(), a)),
        );
    }
    (results, rows)
}

// ── 1. Order invariance ──────────────────────────────────────────────

proptest! {
    #[test]
    fn global_wmape_ignores_row_order(case in arb_case(), seed in any::<u64>()) {
        let (results, rows) = build(&case);
        let (forward, _) = calculate_metrics(&results, &SalesFrame::from_rows(rows.clone()));

        let mut shuffled = rows;
        // deterministic rotation + reverse as a cheap permutation
        let k = (seed as usize) % shuffled.len().max(1);
        shuffled.rotate_left(k);
        shuffled.reverse();
        let (permuted, _) = calculate_metrics(&results, &SalesFrame::from_rows(shuffled));

        prop_assert_eq!(forward, permuted);
    }
}

// ── 2 + 3. Pooling and bounds ────────────────────────────────────────

proptest! {
    #[test]
    fn global_is_pooled_and_bounded(case in arb_case()) {
        let (results, rows) = build(&case);
        let (global, metrics) = calculate_metrics(&results, &SalesFrame::from_rows(rows));
        let global = global.unwrap();

        let pooled = metrics.abs_error_sum() / metrics.actual_sum();
        prop_assert!((global - pooled).abs() < 1e-12);

        let rates: Vec<f64> = metrics.rows().iter().map(|r| r.wmape.unwrap()).collect();
        let lo = rates.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(global >= lo - 1e-12 && global <= hi + 1e-12);

        // ranking is ascending
        for w in rates.windows(2) {
            prop_assert!(w[0] <= w[1]);
        }
    }
}

// ── 4. Zero only on exact matches ────────────────────────────────────

proptest! {
    #[test]
    fn zero_only_on_exact_match(case in arb_case()) {
        let (results, rows) = build(&case);
        let (global, _) = calculate_metrics(&results, &SalesFrame::from_rows(rows));
        let global = global.unwrap();
        prop_assert!(global >= 0.0);

        let exact = case.iter().all(|(a, p)| a == p);
        prop_assert_eq!(global == 0.0, exact);

        // predicting the actuals exactly always scores zero
        let perfect: Vec<(Vec<f64>, Vec<f64>)> =
            case.iter().map(|(a, _)| (a.clone(), a.clone())).collect();
        let (results, rows) = build(&perfect);
        let (zero, _) = calculate_metrics(&results, &SalesFrame::from_rows(rows));
        prop_assert_eq!(zero, Some(0.0));
    }
}

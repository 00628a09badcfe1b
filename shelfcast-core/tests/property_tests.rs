//! Property tests for domain and model invariants.
//!
//! Uses proptest to verify:
//! 1. Forecast length — unique history dates + horizon
//! 2. Future window — contiguous calendar days after the last observation
//! 3. Split disjointness — training and validation never share a date
//! 4. Non-negativity — predictions are clipped at zero

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use shelfcast_core::domain::{SalesFrame, TimeSeriesRow};
use shelfcast_core::holidays::HolidayCalendar;
use shelfcast_core::model::{
    DecompositionForecaster, FittedModel, Forecaster, ModelConfig, Series,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 6, 1).unwrap()
}

/// Day offsets (possibly repeated, possibly with gaps) and sales values.
fn arb_observations() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0i64..120, 0.0..500.0_f64), 1..80)
}

fn series_of(obs: &[(i64, f64)]) -> Series {
    Series::from_points(obs.iter().map(|&(d, v)| (base() + Duration::days(d), v)))
}

fn light_config() -> ModelConfig {
    // keep proptest iterations fast
    ModelConfig {
        yearly_seasonality: false,
        n_changepoints: 5,
        ..ModelConfig::retail()
    }
}

// ── 1 + 2. Forecast window ───────────────────────────────────────────

proptest! {
    #[test]
    fn forecast_covers_history_plus_horizon(obs in arb_observations(), horizon in 0u32..45) {
        let series = series_of(&obs);
        let model = DecompositionForecaster
            .fit(&series, &HolidayCalendar::new(), &light_config())
            .unwrap();
        let dates = model.make_future_dates(horizon);
        prop_assert_eq!(dates.len(), series.len() + horizon as usize);

        let last = series.last_date().unwrap();
        let future = &dates[series.len()..];
        for (i, d) in future.iter().enumerate() {
            prop_assert_eq!(*d, last + Duration::days(i as i64 + 1));
        }
        for w in dates.windows(2) {
            prop_assert!(w[0] < w[1]);
        }
    }
}

// ── 3. Split disjointness ────────────────────────────────────────────

proptest! {
    #[test]
    fn split_frames_are_disjoint(obs in arb_observations(), cutoff in 0i64..120, horizon in 1u32..60) {
        let frame: SalesFrame = obs
            .iter()
            .map(|&(d, v)| TimeSeriesRow::new(base() + Duration::days(d), "GROCERY I", v))
            .collect();
        let cutoff = base() + Duration::days(cutoff);
        let (train, valid) = frame.split_at(cutoff, horizon);

        prop_assert!(train.rows().iter().all(|r| r.date <= cutoff));
        let valid_in_window = valid.rows().iter().all(|r| {
            r.date > cutoff && r.date <= cutoff + Duration::days(i64::from(horizon))
        });
        prop_assert!(valid_in_window);
        prop_assert!(train.len() + valid.len() <= frame.len());
    }
}

// ── 4. Non-negativity ────────────────────────────────────────────────

proptest! {
    #[test]
    fn predictions_are_never_negative(obs in arb_observations()) {
        let series = series_of(&obs);
        let model = DecompositionForecaster
            .fit(&series, &HolidayCalendar::new(), &light_config())
            .unwrap();
        let points = model.predict(&model.make_future_dates(30)).unwrap();
        for p in points {
            prop_assert!(p.yhat >= 0.0);
            prop_assert!(p.yhat_lower >= 0.0);
            prop_assert!(p.yhat_lower <= p.yhat_upper);
        }
    }
}

//! Criterion benchmarks for the training orchestrator and the evaluator.
//!
//! Run with: `cargo bench -p shelfcast-runner`
//!
//! These benchmarks measure:
//! - Single-category fit + forecast with the default model
//! - Full fan-out over many categories at different worker counts
//! - WMAPE evaluation over a large result store

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shelfcast_core::domain::SalesFrame;
use shelfcast_core::holidays::{HolidayCalendar, StaticHolidays};
use shelfcast_core::model::{DecompositionForecaster, ModelConfig};
use shelfcast_runner::{
    calculate_metrics, generate_synthetic_sales, split_frames, train_category, EngineOptions,
    ForecastEngine,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn category_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("FAMILY_{i:02}")).collect()
}

/// Benchmark one category over 18 months of history.
fn bench_single_category(c: &mut Criterion) {
    let rows = generate_synthetic_sales(&["GROCERY I"], d(2016, 1, 1), d(2017, 7, 15));
    let holidays = HolidayCalendar::new();
    let config = ModelConfig::retail();

    c.bench_function("train_category_18m", |b| {
        b.iter(|| {
            let _ = train_category(
                &DecompositionForecaster,
                "GROCERY I",
                black_box(&rows),
                &holidays,
                &config,
                30,
            );
        });
    });
}

/// Benchmark the orchestrator fan-out at different worker counts.
fn bench_fan_out(c: &mut Criterion) {
    let names = category_names(33);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let rows = generate_synthetic_sales(&refs, d(2016, 7, 1), d(2017, 7, 15));

    let mut group = c.benchmark_group("train_all_categories");
    group.sample_size(10);

    for workers in [1usize, 2, 4, 0] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let mut engine = ForecastEngine::with_options(
                    SalesFrame::from_rows(rows.clone()),
                    30,
                    &StaticHolidays::none(),
                    DecompositionForecaster,
                    EngineOptions {
                        workers,
                        ..EngineOptions::default()
                    },
                )
                .unwrap();
                let _ = engine.train_all_categories().map(|r| r.len());
            });
        });
    }

    group.finish();
}

/// Benchmark evaluation over a trained store.
fn bench_evaluate(c: &mut Criterion) {
    let names = category_names(33);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let rows = generate_synthetic_sales(&refs, d(2017, 1, 1), d(2017, 8, 15));
    let (training, validation) = split_frames(rows, d(2017, 7, 15), 30);

    let mut engine = ForecastEngine::new(
        training,
        30,
        &StaticHolidays::none(),
        DecompositionForecaster,
    )
    .unwrap();
    let results = engine.train_all_categories().unwrap().clone();

    c.bench_function("calculate_metrics_33", |b| {
        b.iter(|| {
            let _ = calculate_metrics(black_box(&results), black_box(&validation));
        });
    });
}

criterion_group!(benches, bench_single_category, bench_fan_out, bench_evaluate);
criterion_main!(benches);

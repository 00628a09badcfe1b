//! Shelfcast Runner — parallel training, evaluation, loading and export.
//!
//! This crate builds on `shelfcast-core` to provide:
//! - Sales CSV loading, cleaning and train/validation split
//! - Per-category trainer
//! - Parallel training orchestrator with fail-fast or isolated failures
//! - WMAPE evaluation (per category and volume-weighted global)
//! - TOML pipeline config and end-to-end runner
//! - JSON / CSV / Markdown export

pub mod config;
pub mod data_loader;
pub mod engine;
pub mod evaluate;
pub mod export;
pub mod runner;
pub mod trainer;

pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{
    compute_dataset_hash, generate_synthetic_sales, load_sales_csv, split_frames, synthetic_data,
    CleaningStats, ColumnNames, LoadError, LoadedData,
};
pub use engine::{
    CategoryFailure, EngineError, EngineOptions, FailurePolicy, ForecastEngine, ModelStore,
    ResultStore,
};
pub use evaluate::{calculate_metrics, CategoryMetrics, Exclusion, ExclusionReason, MetricsFrame};
pub use runner::{
    run_forecast, run_from_config, run_with_data, FailureRecord, RunError, RunOutcome, RunReport,
    SCHEMA_VERSION,
};
pub use trainer::{train_category, TrainError, TrainErrorKind, TrainOutput};

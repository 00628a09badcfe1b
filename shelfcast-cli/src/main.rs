//! Shelfcast CLI — forecast per-category sales and score the forecast.
//!
//! Commands:
//! - `run` — load sales, train one model per category in parallel, print the
//!   global WMAPE and the best categories, optionally save artifacts
//! - `synth` — write a synthetic sales CSV for demos

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use shelfcast_runner::data_loader::write_sales_csv;
use shelfcast_runner::export::{format_wmape, save_artifacts};
use shelfcast_runner::{
    generate_synthetic_sales, run_from_config, run_with_data, synthetic_data, ColumnNames,
    FailurePolicy, PipelineConfig, RunOutcome,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_TRAIN_END: &str = "2017-07-15";

const DEMO_CATEGORIES: &[&str] = &[
    "AUTOMOTIVE",
    "BEVERAGES",
    "BREAD/BAKERY",
    "CLEANING",
    "DAIRY",
    "GROCERY I",
    "MEATS",
    "PERSONAL CARE",
    "POULTRY",
    "PRODUCE",
];

#[derive(Parser)]
#[command(
    name = "shelfcast",
    about = "Shelfcast CLI — parallel per-category sales forecasting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, forecast and evaluate every category.
    Run {
        /// Path to a TOML config file. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Sales CSV (columns date, family, sales by default).
        #[arg(long)]
        train_csv: Option<PathBuf>,

        /// Holiday events CSV (date + holiday/description columns).
        #[arg(long)]
        holidays_csv: Option<PathBuf>,

        /// Last training date (YYYY-MM-DD). Defaults to 2017-07-15.
        #[arg(long)]
        train_end: Option<String>,

        /// Forecast horizon in days. Defaults to 30.
        #[arg(long)]
        horizon: Option<u32>,

        /// Worker threads (0 = all cores).
        #[arg(long)]
        workers: Option<usize>,

        /// Abort the whole batch on the first failing category.
        #[arg(long, default_value_t = false)]
        fail_fast: bool,

        /// Per-category time budget in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Number of best categories to print.
        #[arg(long)]
        top: Option<usize>,

        /// Directory for report.json, metrics.csv, forecasts.csv, report.md.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Ignore input files and run on synthetic sales.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Write synthetic daily sales to a CSV file.
    Synth {
        /// Output path.
        #[arg(long, default_value = "synthetic_sales.csv")]
        out: PathBuf,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2015-01-01")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2017-08-15")]
        end: String,

        /// Categories to generate. Defaults to ten demo families.
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfcast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            train_csv,
            holidays_csv,
            train_end,
            horizon,
            workers,
            fail_fast,
            timeout_secs,
            top,
            output_dir,
            synthetic,
        } => {
            let overrides = RunOverrides {
                train_csv,
                holidays_csv,
                train_end,
                horizon,
                workers,
                fail_fast,
                timeout_secs,
                top,
                output_dir,
            };
            run_pipeline_cmd(config, overrides, synthetic)
        }
        Commands::Synth {
            out,
            start,
            end,
            categories,
        } => run_synth_cmd(out, &start, &end, categories),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("pipeline failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Flag values that override the config file.
struct RunOverrides {
    train_csv: Option<PathBuf>,
    holidays_csv: Option<PathBuf>,
    train_end: Option<String>,
    horizon: Option<u32>,
    workers: Option<usize>,
    fail_fast: bool,
    timeout_secs: Option<u64>,
    top: Option<usize>,
    output_dir: Option<PathBuf>,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn build_config(
    config_path: Option<PathBuf>,
    o: RunOverrides,
    synthetic: bool,
) -> Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => {
            let train_csv = match (&o.train_csv, synthetic) {
                (Some(p), _) => p.clone(),
                (None, true) => PathBuf::from("<synthetic>"),
                (None, false) => bail!("one of --config, --train-csv or --synthetic is required"),
            };
            PipelineConfig::new(train_csv, parse_date(DEFAULT_TRAIN_END)?)
        }
    };

    if let Some(p) = o.train_csv {
        config.data.train_csv = p;
    }
    if let Some(p) = o.holidays_csv {
        config.data.holidays_csv = Some(p);
    }
    if let Some(s) = o.train_end {
        config.split.train_end_date = parse_date(&s)?;
    }
    if let Some(h) = o.horizon {
        config.split.forecast_horizon = h;
    }
    if let Some(w) = o.workers {
        config.engine.workers = w;
    }
    if o.fail_fast {
        config.engine.failure_policy = FailurePolicy::FailFast;
    }
    if let Some(t) = o.timeout_secs {
        config.engine.category_timeout_secs = Some(t);
    }
    if let Some(n) = o.top {
        config.report.top_n = n;
    }
    if let Some(dir) = o.output_dir {
        config.report.output_dir = Some(dir);
    }

    config.validate()?;
    Ok(config)
}

fn run_pipeline_cmd(config_path: Option<PathBuf>, overrides: RunOverrides, synthetic: bool) -> Result<()> {
    let config = build_config(config_path, overrides, synthetic)?;

    let outcome = if synthetic {
        let end = config.split.train_end_date
            + Duration::days(i64::from(config.split.forecast_horizon));
        let start = config.split.train_end_date - Duration::days(365 * 2);
        let loaded = synthetic_data(DEMO_CATEGORIES, start, end);
        run_with_data(&config, &loaded)?
    } else {
        run_from_config(&config)?
    };

    print_summary(&outcome, config.report.top_n);

    if let Some(dir) = &config.report.output_dir {
        let run_dir = save_artifacts(&outcome, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_summary(outcome: &RunOutcome, top_n: usize) {
    let report = &outcome.report;
    if report.has_synthetic {
        println!("WARNING: results computed on SYNTHETIC data");
    }
    println!(
        "Trained {} of {} categories (train end {}, horizon {} days) in {:.1}s",
        report.categories_trained,
        report.categories_total,
        report.train_end_date,
        report.forecast_horizon,
        report.elapsed_secs
    );
    println!("Global WMAPE: {}", format_wmape(report.global_wmape));

    let top = report.metrics.top(top_n);
    if !top.is_empty() {
        println!();
        println!("Top {} categories:", top.len());
        println!("{:<4} {:<32} {:>12}", "#", "Category", "WMAPE");
        for (i, row) in top.iter().enumerate() {
            println!(
                "{:<4} {:<32} {:>12}",
                i + 1,
                row.category,
                format_wmape(row.wmape)
            );
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("Failed categories:");
        for f in &report.failures {
            println!("  {} [{}]: {}", f.category, f.kind, f.message);
        }
    }
    let excluded = report.metrics.excluded();
    if !excluded.is_empty() {
        println!();
        println!("{} categories excluded from scoring", excluded.len());
    }
}

fn run_synth_cmd(out: PathBuf, start: &str, end: &str, categories: Vec<String>) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if end < start {
        bail!("--end {end} is before --start {start}");
    }

    let names: Vec<&str> = if categories.is_empty() {
        DEMO_CATEGORIES.to_vec()
    } else {
        categories.iter().map(String::as_str).collect()
    };
    let rows = generate_synthetic_sales(&names, start, end);
    write_sales_csv(&rows, &out, &ColumnNames::default())
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!(
        "Wrote {} rows for {} categories to {}",
        rows.len(),
        names.len(),
        out.display()
    );
    Ok(())
}

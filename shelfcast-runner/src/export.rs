//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for a forecasting run:
//! - **JSON**: the `RunReport`, round-trip serializable with schema versioning
//! - **CSV**: the ranked metrics table and every forecast point
//! - **Markdown**: a human-readable run summary
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::engine::ResultStore;
use crate::evaluate::MetricsFrame;
use crate::runner::{RunOutcome, RunReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the ranked metrics table.
///
/// Columns: rank, category, wmape, abs_error_sum, actual_sum, aligned_dates.
/// An undefined WMAPE is written as an empty field.
pub fn export_metrics_csv(metrics: &MetricsFrame) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "category",
        "wmape",
        "abs_error_sum",
        "actual_sum",
        "aligned_dates",
    ])?;
    for (i, row) in metrics.rows().iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            row.category.clone(),
            row.wmape.map(|w| format!("{w:.6}")).unwrap_or_default(),
            format!("{:.4}", row.abs_error_sum),
            format!("{:.4}", row.actual_sum),
            row.aligned_dates.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export every forecast point, categories in key order.
///
/// Columns: category, date, yhat, yhat_lower, yhat_upper, trend, is_future.
pub fn export_forecasts_csv(forecasts: &ResultStore) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "category",
        "date",
        "yhat",
        "yhat_lower",
        "yhat_upper",
        "trend",
        "is_future",
    ])?;
    for (category, forecast) in forecasts {
        let history_len = forecast.history().len();
        for (i, p) in forecast.points().iter().enumerate() {
            wtr.write_record([
                category.clone(),
                p.date.to_string(),
                format!("{:.4}", p.yhat),
                format!("{:.4}", p.yhat_lower),
                format!("{:.4}", p.yhat_upper),
                format!("{:.4}", p.trend),
                (i >= history_len).to_string(),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates a directory named `run_{cutoff}_{timestamp}/` under `output_dir`
/// containing:
/// - `report.json` — the full `RunReport`
/// - `metrics.csv` — ranked per-category metrics
/// - `forecasts.csv` — every forecast point
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(outcome: &RunOutcome, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "run_{}_{}",
        outcome.report.train_end_date.format("%Y%m%d"),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(&outcome.report)?;
    std::fs::write(run_dir.join("report.json"), &json)?;

    let metrics_csv = export_metrics_csv(&outcome.report.metrics)?;
    std::fs::write(run_dir.join("metrics.csv"), &metrics_csv)?;

    let forecasts_csv = export_forecasts_csv(&outcome.forecasts)?;
    std::fs::write(run_dir.join("forecasts.csv"), &forecasts_csv)?;

    std::fs::write(run_dir.join("report.md"), generate_report(&outcome.report, 10))?;

    Ok(run_dir)
}

/// Load a `RunReport` from an artifact directory's report.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<RunReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Format an optional WMAPE as a percentage with four decimals.
pub fn format_wmape(wmape: Option<f64>) -> String {
    match wmape {
        Some(w) => format!("{:.4}%", w * 100.0),
        None => "undefined".to_string(),
    }
}

/// Generate a Markdown report listing the `top_n` best categories.
pub fn generate_report(report: &RunReport, top_n: usize) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Forecast Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Model | {} |\n", report.forecaster));
    md.push_str(&format!("| Train End | {} |\n", report.train_end_date));
    md.push_str(&format!("| Horizon | {} days |\n", report.forecast_horizon));
    md.push_str(&format!(
        "| Rows | {} training / {} validation |\n",
        report.training_rows, report.validation_rows
    ));
    md.push_str(&format!(
        "| Categories | {} trained of {} |\n",
        report.categories_trained, report.categories_total
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    if report.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Accuracy\n\n");
    md.push_str(&format!(
        "Global WMAPE: **{}**\n\n",
        format_wmape(report.global_wmape)
    ));

    let top = report.metrics.top(top_n);
    if !top.is_empty() {
        md.push_str(&format!("### Top {} categories\n\n", top.len()));
        md.push_str("| Rank | Category | WMAPE | Abs Error | Actual |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for (i, row) in top.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} | {:.2} | {:.2} |\n",
                i + 1,
                row.category,
                format_wmape(row.wmape),
                row.abs_error_sum,
                row.actual_sum
            ));
        }
        md.push('\n');
    }

    let excluded = report.metrics.excluded();
    if !excluded.is_empty() {
        md.push_str("## Excluded\n\n");
        for e in excluded {
            md.push_str(&format!("- {}: {:?}\n", e.category, e.reason));
        }
        md.push('\n');
    }

    if !report.failures.is_empty() {
        md.push_str("## Failures\n\n");
        for f in &report.failures {
            md.push_str(&format!("- {} ({}): {}\n", f.category, f.kind, f.message));
        }
        md.push('\n');
    }

    let c = &report.cleaning;
    if c.dropped_bad_date + c.dropped_bad_value + c.clamped_negative > 0 {
        md.push_str("## Data Quality\n\n");
        md.push_str(&format!("- Rows read: {}\n", c.rows_read));
        md.push_str(&format!("- Dropped (bad date): {}\n", c.dropped_bad_date));
        md.push_str(&format!("- Dropped (bad value): {}\n", c.dropped_bad_value));
        md.push_str(&format!("- Negative values clamped: {}\n", c.clamped_negative));
        md.push('\n');
    }

    md
}

//! Sales loading, cleaning and train/validation split.
//!
//! Reads a long-format CSV (one row per date × category, optionally per
//! store) and rolls it up to one value per (date, category):
//! 1. Rows with an unparseable date or non-numeric value → dropped, counted
//! 2. Negative values → clamped to zero, counted
//! 3. Duplicate (date, category) rows → summed
//!
//! Synthetic data is a developer-only mode. Loads produced from it are tagged
//! so reports can flag them.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use shelfcast_core::domain::{Category, SalesFrame, TimeSeriesRow, TrainingFrame, ValidationFrame};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}' in sales file")]
    MissingColumn(String),
}

/// Column names of the sales file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub date: String,
    pub category: String,
    pub value: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "date".into(),
            category: "family".into(),
            value: "sales".into(),
        }
    }
}

/// What cleaning did to the raw file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_read: usize,
    pub dropped_bad_date: usize,
    pub dropped_bad_value: usize,
    pub clamped_negative: usize,
    /// Raw rows folded into an existing (date, category) total.
    pub merged_duplicates: usize,
}

/// Cleaned rows with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// One row per (date, category), sorted.
    pub rows: Vec<TimeSeriesRow>,
    pub stats: CleaningStats,
    /// BLAKE3 over the cleaned rows.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedData {
    fn from_clean(rows: Vec<TimeSeriesRow>, stats: CleaningStats, has_synthetic: bool) -> Self {
        let dataset_hash = compute_dataset_hash(&rows);
        Self {
            rows,
            stats,
            dataset_hash,
            has_synthetic,
        }
    }
}

/// Load and clean a sales CSV from disk.
pub fn load_sales_csv(path: &Path, columns: &ColumnNames) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_sales(file, columns)?;
    tracing::info!(
        path = %path.display(),
        rows = loaded.rows.len(),
        dropped = loaded.stats.dropped_bad_date + loaded.stats.dropped_bad_value,
        clamped = loaded.stats.clamped_negative,
        "sales loaded"
    );
    Ok(loaded)
}

/// Load and clean sales from any CSV reader.
pub fn read_sales<R: Read>(reader: R, columns: &ColumnNames) -> Result<LoadedData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index_of = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let date_idx = index_of(&columns.date)?;
    let category_idx = index_of(&columns.category)?;
    let value_idx = index_of(&columns.value)?;

    let mut stats = CleaningStats::default();
    let mut totals: BTreeMap<(NaiveDate, Category), f64> = BTreeMap::new();

    for record in rdr.records() {
        let record = record?;
        stats.rows_read += 1;

        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            stats.dropped_bad_date += 1;
            continue;
        };
        let value = match record.get(value_idx).map(str::parse::<f64>) {
            Some(Ok(v)) if v.is_finite() => v,
            _ => {
                stats.dropped_bad_value += 1;
                continue;
            }
        };
        let category = record.get(category_idx).unwrap_or_default().to_string();
        accumulate(&mut totals, &mut stats, date, category, value);
    }

    let rows = totals
        .into_iter()
        .map(|((date, category), value)| TimeSeriesRow::new(date, category, value))
        .collect();
    Ok(LoadedData::from_clean(rows, stats, false))
}

/// Clean rows that are already typed: same rules as the CSV path.
pub fn clean_rows<I: IntoIterator<Item = TimeSeriesRow>>(raw: I) -> (Vec<TimeSeriesRow>, CleaningStats) {
    let mut stats = CleaningStats::default();
    let mut totals: BTreeMap<(NaiveDate, Category), f64> = BTreeMap::new();
    for row in raw {
        stats.rows_read += 1;
        if !row.value.is_finite() {
            stats.dropped_bad_value += 1;
            continue;
        }
        accumulate(&mut totals, &mut stats, row.date, row.category, row.value);
    }
    let rows = totals
        .into_iter()
        .map(|((date, category), value)| TimeSeriesRow::new(date, category, value))
        .collect();
    (rows, stats)
}

fn accumulate(
    totals: &mut BTreeMap<(NaiveDate, Category), f64>,
    stats: &mut CleaningStats,
    date: NaiveDate,
    category: Category,
    value: f64,
) {
    let value = if value < 0.0 {
        stats.clamped_negative += 1;
        0.0
    } else {
        value
    };
    match totals.entry((date, category)) {
        std::collections::btree_map::Entry::Occupied(mut e) => {
            stats.merged_duplicates += 1;
            *e.get_mut() += value;
        }
        std::collections::btree_map::Entry::Vacant(e) => {
            e.insert(value);
        }
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Write rows in the loader's own format (used by `shelfcast synth`).
pub fn write_sales_csv(
    rows: &[TimeSeriesRow],
    path: &Path,
    columns: &ColumnNames,
) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([&columns.date, &columns.category, &columns.value])?;
    for row in rows {
        wtr.write_record([
            row.date.to_string(),
            row.category.clone(),
            format!("{:.2}", row.value),
        ])?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Partition rows at `cutoff`: training is `date <= cutoff`, validation is
/// `cutoff < date <= cutoff + horizon_days`.
pub fn split_frames(
    rows: Vec<TimeSeriesRow>,
    cutoff: NaiveDate,
    horizon_days: u32,
) -> (TrainingFrame, ValidationFrame) {
    SalesFrame::from_rows(rows).split_at(cutoff, horizon_days)
}

/// Compute a deterministic BLAKE3 hash over cleaned rows.
///
/// Rows are hashed in (date, category) order, so the hash does not depend on
/// the order of the input file.
pub fn compute_dataset_hash(rows: &[TimeSeriesRow]) -> String {
    let mut sorted: Vec<&TimeSeriesRow> = rows.iter().collect();
    sorted.sort_by(|a, b| (a.date, &a.category).cmp(&(b.date, &b.category)));

    let mut hasher = blake3::Hasher::new();
    for row in sorted {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(row.category.as_bytes());
        hasher.update(&[0]);
        hasher.update(&row.value.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Synthetic sales for `categories` over `start..=end`, tagged as synthetic.
pub fn synthetic_data(categories: &[&str], start: NaiveDate, end: NaiveDate) -> LoadedData {
    let rows = generate_synthetic_sales(categories, start, end);
    let stats = CleaningStats {
        rows_read: rows.len(),
        ..CleaningStats::default()
    };
    tracing::warn!(
        categories = categories.len(),
        rows = rows.len(),
        "using synthetic sales, results will be tagged as synthetic"
    );
    LoadedData::from_clean(rows, stats, true)
}

/// Generate daily synthetic sales with weekly and yearly seasonality.
///
/// Each category is seeded from the BLAKE3 hash of its name, so output is
/// deterministic per category and independent of the other categories.
pub fn generate_synthetic_sales(categories: &[&str], start: NaiveDate, end: NaiveDate) -> Vec<TimeSeriesRow> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rows = Vec::new();
    for category in categories {
        let seed: [u8; 32] = *blake3::hash(category.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let level: f64 = rng.gen_range(50.0..2000.0);
        let growth_per_day: f64 = rng.gen_range(-0.0002..0.0008);
        let weekend_uplift: f64 = rng.gen_range(0.1..0.6);
        let yearly_amplitude: f64 = rng.gen_range(0.0..0.25);

        let mut current = start;
        let mut day = 0.0_f64;
        while current <= end {
            let weekly = match current.weekday() {
                Weekday::Sat | Weekday::Sun => 1.0 + weekend_uplift,
                _ => 1.0,
            };
            let yearly = 1.0
                + yearly_amplitude
                    * (2.0 * std::f64::consts::PI * f64::from(current.ordinal()) / 365.25).sin();
            let noise: f64 = rng.gen_range(0.9..1.1);
            let value = level * (1.0 + growth_per_day * day) * weekly * yearly * noise;
            rows.push(TimeSeriesRow::new(current, *category, value.max(0.0)));

            current += chrono::Duration::days(1);
            day += 1.0;
        }
    }
    rows.sort_by(|a, b| (a.date, &a.category).cmp(&(b.date, &b.category)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const SAMPLE: &str = "\
id,date,store_nbr,family,sales,onpromotion
0,2017-01-01,1,GROCERY I,10.5,0
1,2017-01-01,2,GROCERY I,4.5,0
2,2017-01-01,1,BEVERAGES,-3,0
3,not-a-date,1,BEVERAGES,7,0
4,2017-01-02,1,BEVERAGES,abc,0
5,2017-01-02 00:00:00,1,BEVERAGES,8,1
";

    #[test]
    fn cleaning_rules_are_applied() {
        let loaded = read_sales(SAMPLE.as_bytes(), &ColumnNames::default()).unwrap();
        let stats = loaded.stats;
        assert_eq!(stats.rows_read, 6);
        assert_eq!(stats.dropped_bad_date, 1);
        assert_eq!(stats.dropped_bad_value, 1);
        assert_eq!(stats.clamped_negative, 1);
        assert_eq!(stats.merged_duplicates, 1);

        assert_eq!(
            loaded.rows,
            vec![
                TimeSeriesRow::new(d(2017, 1, 1), "BEVERAGES", 0.0),
                TimeSeriesRow::new(d(2017, 1, 1), "GROCERY I", 15.0),
                TimeSeriesRow::new(d(2017, 1, 2), "BEVERAGES", 8.0),
            ]
        );
        assert!(!loaded.has_synthetic);
    }

    #[test]
    fn custom_column_names() {
        let csv = "day,dept,units\n2017-03-01,DAIRY,3\n";
        let columns = ColumnNames {
            date: "day".into(),
            category: "dept".into(),
            value: "units".into(),
        };
        let loaded = read_sales(csv.as_bytes(), &columns).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].category, "DAIRY");
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "date,family\n2017-03-01,DAIRY\n";
        let err = read_sales(csv.as_bytes(), &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "sales"));
    }

    #[test]
    fn load_from_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let loaded = load_sales_csv(&path, &ColumnNames::default()).unwrap();
        assert_eq!(loaded.rows.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_sales_csv(Path::new("/nonexistent/train.csv"), &ColumnNames::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn dataset_hash_ignores_input_order() {
        let a = vec![
            TimeSeriesRow::new(d(2017, 1, 1), "A", 1.0),
            TimeSeriesRow::new(d(2017, 1, 2), "B", 2.0),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(compute_dataset_hash(&a), compute_dataset_hash(&b));

        let mut c = a.clone();
        c[0].value = 1.5;
        assert_ne!(compute_dataset_hash(&a), compute_dataset_hash(&c));
    }

    #[test]
    fn synthetic_data_is_deterministic() {
        let rows1 = generate_synthetic_sales(&["DAIRY"], d(2016, 1, 1), d(2016, 3, 31));
        let rows2 = generate_synthetic_sales(&["DAIRY"], d(2016, 1, 1), d(2016, 3, 31));
        assert_eq!(rows1, rows2);
        assert_eq!(rows1.len(), 91);
        assert!(rows1.iter().all(|r| r.is_valid()));
    }

    #[test]
    fn synthetic_categories_are_independent() {
        let alone = generate_synthetic_sales(&["DAIRY"], d(2016, 1, 1), d(2016, 1, 31));
        let both = generate_synthetic_sales(&["BREAD/BAKERY", "DAIRY"], d(2016, 1, 1), d(2016, 1, 31));
        let dairy: Vec<TimeSeriesRow> = both.into_iter().filter(|r| r.category == "DAIRY").collect();
        assert_eq!(alone, dairy);
    }

    #[test]
    fn synthetic_load_is_tagged() {
        let loaded = synthetic_data(&["A", "B"], d(2016, 1, 1), d(2016, 1, 10));
        assert!(loaded.has_synthetic);
        assert_eq!(loaded.rows.len(), 20);
        assert!(!loaded.dataset_hash.is_empty());
    }

    #[test]
    fn split_respects_cutoff_and_horizon() {
        let rows = generate_synthetic_sales(&["A"], d(2017, 7, 1), d(2017, 8, 31));
        let (train, valid) = split_frames(rows, d(2017, 7, 15), 30);
        assert_eq!(train.date_range(), Some((d(2017, 7, 1), d(2017, 7, 15))));
        assert_eq!(valid.date_range(), Some((d(2017, 7, 16), d(2017, 8, 14))));
    }

    #[test]
    fn written_csv_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synth.csv");
        let rows = vec![TimeSeriesRow::new(d(2017, 1, 1), "A", 1.25)];
        write_sales_csv(&rows, &path, &ColumnNames::default()).unwrap();
        let loaded = load_sales_csv(&path, &ColumnNames::default()).unwrap();
        assert_eq!(loaded.rows, rows);
    }

    #[test]
    fn clean_rows_matches_csv_rules() {
        let (rows, stats) = clean_rows(vec![
            TimeSeriesRow::new(d(2017, 1, 1), "A", -1.0),
            TimeSeriesRow::new(d(2017, 1, 1), "A", 2.0),
            TimeSeriesRow::new(d(2017, 1, 2), "A", f64::NAN),
        ]);
        assert_eq!(rows, vec![TimeSeriesRow::new(d(2017, 1, 1), "A", 2.0)]);
        assert_eq!(stats.clamped_negative, 1);
        assert_eq!(stats.merged_duplicates, 1);
        assert_eq!(stats.dropped_bad_value, 1);
    }
}

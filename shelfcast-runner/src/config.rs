//! TOML pipeline configuration.
//!
//! ```toml
//! [data]
//! train_csv = "data/train.csv"
//! holidays_csv = "data/holidays_events.csv"   # optional
//!
//! [data.columns]          # optional, defaults shown
//! date = "date"
//! category = "family"
//! value = "sales"
//!
//! [split]
//! train_end_date = "2017-07-15"
//! forecast_horizon = 30
//!
//! [engine]
//! workers = 0                   # 0 = all cores
//! failure_policy = "isolate"    # or "fail_fast"
//! category_timeout_secs = 600   # optional
//!
//! [report]
//! top_n = 5
//! output_dir = "runs"           # optional
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_loader::ColumnNames;
use crate::engine::{EngineOptions, FailurePolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration of one forecasting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data: DataSection,
    pub split: SplitSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub train_csv: PathBuf,
    #[serde(default)]
    pub holidays_csv: Option<PathBuf>,
    #[serde(default)]
    pub columns: ColumnNames,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSection {
    /// Last date included in training (quoted `YYYY-MM-DD`).
    pub train_end_date: NaiveDate,
    #[serde(default = "default_horizon")]
    pub forecast_horizon: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub category_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            output_dir: None,
        }
    }
}

fn default_horizon() -> u32 {
    30
}

fn default_top_n() -> usize {
    5
}

impl PipelineConfig {
    /// Config for `train_csv` with every other value at its default.
    pub fn new(train_csv: impl Into<PathBuf>, train_end_date: NaiveDate) -> Self {
        Self {
            data: DataSection {
                train_csv: train_csv.into(),
                holidays_csv: None,
                columns: ColumnNames::default(),
            },
            split: SplitSection {
                train_end_date,
                forecast_horizon: default_horizon(),
            },
            engine: EngineSection::default(),
            report: ReportSection::default(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split.forecast_horizon == 0 {
            return Err(ConfigError::Invalid(
                "split.forecast_horizon must be a positive number of days".into(),
            ));
        }
        if self.engine.category_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.category_timeout_secs must be positive when set".into(),
            ));
        }
        let cols = &self.data.columns;
        if cols.date.is_empty() || cols.category.is_empty() || cols.value.is_empty() {
            return Err(ConfigError::Invalid("data.columns entries must be non-empty".into()));
        }
        Ok(())
    }

    /// Orchestrator options for this config, with the retail model policy.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            workers: self.engine.workers,
            failure_policy: self.engine.failure_policy,
            category_timeout: self.engine.category_timeout_secs.map(Duration::from_secs),
            ..EngineOptions::default()
        }
    }
}

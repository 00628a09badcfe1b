//! CSV-backed holiday provider.
//!
//! Accepts either a plain `date,holiday` file or the retail holiday-events
//! export (`date,type,locale,locale_name,description,transferred`). In the
//! latter, `description` carries the name and rows with `transferred=True`
//! are skipped because the holiday was moved to another date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{Holiday, HolidayCalendar, HolidayError, HolidayProvider};

const NAME_COLUMNS: &[&str] = &["holiday", "description", "name"];

#[derive(Debug, Clone)]
pub struct CsvHolidayProvider {
    path: PathBuf,
}

impl CsvHolidayProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse holiday rows from any reader.
    pub fn parse<R: std::io::Read>(reader: R) -> Result<HolidayCalendar, HolidayError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let date_idx = find("date").ok_or_else(|| HolidayError::MissingColumn("date".into()))?;
        let name_idx = NAME_COLUMNS
            .iter()
            .find_map(|&c| find(c))
            .ok_or_else(|| HolidayError::MissingColumn("holiday".into()))?;
        let transferred_idx = find("transferred");

        let mut out = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            if let Some(idx) = transferred_idx {
                if record
                    .get(idx)
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"))
                {
                    continue;
                }
            }

            let raw_date = record.get(date_idx).unwrap_or_default();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
                HolidayError::InvalidDate {
                    line,
                    value: raw_date.to_string(),
                }
            })?;
            let name = record.get(name_idx).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            out.push(Holiday::new(date, name));
        }
        Ok(out.into_iter().collect())
    }
}

impl HolidayProvider for CsvHolidayProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn get_holidays(&self) -> Result<HolidayCalendar, HolidayError> {
        let file = std::fs::File::open(&self.path).map_err(|source| HolidayError::Io {
            path: self.path.clone(),
            source,
        })?;
        let calendar = Self::parse(file)?;
        tracing::debug!(
            path = %self.path.display(),
            holidays = calendar.len(),
            "loaded holiday calendar"
        );
        Ok(calendar)
    }
}

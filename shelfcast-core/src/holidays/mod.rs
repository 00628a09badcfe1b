//! Holiday calendars and the provider trait.
//!
//! A [`HolidayCalendar`] is built once per run and shared read-only by every
//! per-category model. Providers abstract over where the calendar comes from
//! (a CSV export, an in-memory list) so tests can inject fixed calendars.

pub mod csv_provider;
pub mod regional;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use csv_provider::CsvHolidayProvider;
pub use regional::{easter_sunday, regional_holidays};

/// A named holiday on a specific date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Set of (date, name) pairs. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    entries: BTreeSet<Holiday>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holiday> {
        self.entries.iter()
    }

    pub fn contains(&self, date: NaiveDate, name: &str) -> bool {
        self.entries.contains(&Holiday::new(date, name))
    }

    /// Names of all holidays falling on `date`.
    pub fn names_on(&self, date: NaiveDate) -> Vec<&str> {
        self.entries
            .range(Holiday::new(date, String::new())..)
            .take_while(|h| h.date == date)
            .map(|h| h.name.as_str())
            .collect()
    }

    /// Calendar years covered by at least one entry.
    pub fn years(&self) -> BTreeSet<i32> {
        self.entries.iter().map(|h| h.date.year()).collect()
    }

    /// Union of two calendars.
    pub fn merged(&self, other: &HolidayCalendar) -> HolidayCalendar {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().cloned());
        HolidayCalendar { entries }
    }
}

impl FromIterator<Holiday> for HolidayCalendar {
    fn from_iter<I: IntoIterator<Item = Holiday>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Errors from holiday providers.
#[derive(Debug, Error)]
pub enum HolidayError {
    #[error("failed to read holiday file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("holiday CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("holiday CSV is missing a '{0}' column")]
    MissingColumn(String),

    #[error("invalid holiday date '{value}' on line {line}")]
    InvalidDate { line: u64, value: String },

    #[error("no regional holiday set for country code '{0}'")]
    UnknownRegion(String),
}

/// Source of the run's holiday calendar.
///
/// Called once per run; the returned calendar is shared by every category.
pub trait HolidayProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn get_holidays(&self) -> Result<HolidayCalendar, HolidayError>;
}

/// Provider backed by an in-memory calendar.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    calendar: HolidayCalendar,
}

impl StaticHolidays {
    pub fn new(calendar: HolidayCalendar) -> Self {
        Self { calendar }
    }

    /// Provider that returns an empty calendar.
    pub fn none() -> Self {
        Self::default()
    }
}

impl HolidayProvider for StaticHolidays {
    fn name(&self) -> &str {
        "static"
    }

    fn get_holidays(&self) -> Result<HolidayCalendar, HolidayError> {
        Ok(self.calendar.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn duplicates_collapse() {
        let cal: HolidayCalendar = vec![
            Holiday::new(d(2016, 12, 25), "Christmas"),
            Holiday::new(d(2016, 12, 25), "Christmas"),
            Holiday::new(d(2016, 12, 25), "Store Event"),
        ]
        .into_iter()
        .collect();
        assert_eq!(cal.len(), 2);
        assert_eq!(cal.names_on(d(2016, 12, 25)), vec!["Christmas", "Store Event"]);
        assert!(cal.names_on(d(2016, 12, 24)).is_empty());
    }

    #[test]
    fn merge_is_a_union() {
        let a: HolidayCalendar = vec![Holiday::new(d(2016, 1, 1), "New Year's Day")]
            .into_iter()
            .collect();
        let b: HolidayCalendar = vec![
            Holiday::new(d(2016, 1, 1), "New Year's Day"),
            Holiday::new(d(2017, 5, 1), "Labour Day"),
        ]
        .into_iter()
        .collect();
        let merged = a.merged(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.years().into_iter().collect::<Vec<_>>(), vec![2016, 2017]);
        // inputs untouched
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn static_provider_returns_its_calendar() {
        let cal: HolidayCalendar = vec![Holiday::new(d(2017, 8, 10), "Independence")]
            .into_iter()
            .collect();
        let provider = StaticHolidays::new(cal.clone());
        assert_eq!(provider.get_holidays().unwrap(), cal);
        assert!(StaticHolidays::none().get_holidays().unwrap().is_empty());
    }
}

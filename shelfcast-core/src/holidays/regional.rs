//! Built-in regional holiday sets, keyed by ISO country code.

use std::ops::RangeInclusive;

use chrono::{Duration, NaiveDate};

use super::{Holiday, HolidayCalendar, HolidayError};

/// Easter Sunday (Gregorian) for `year`, via the anonymous Gregorian algorithm.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// National holidays for `country` across `years`.
///
/// Only `EC` (Ecuador) is built in.
pub fn regional_holidays(
    country: &str,
    years: RangeInclusive<i32>,
) -> Result<HolidayCalendar, HolidayError> {
    match country.to_ascii_uppercase().as_str() {
        "EC" => Ok(ecuador(years)),
        other => Err(HolidayError::UnknownRegion(other.to_string())),
    }
}

const EC_FIXED: &[(u32, u32, &str)] = &[
    (1, 1, "New Year's Day"),
    (5, 1, "Labour Day"),
    (5, 24, "Battle of Pichincha"),
    (8, 10, "Declaration of Independence of Quito"),
    (10, 9, "Independence of Guayaquil"),
    (11, 2, "All Souls' Day"),
    (11, 3, "Independence of Cuenca"),
    (12, 25, "Christmas Day"),
];

fn ecuador(years: RangeInclusive<i32>) -> HolidayCalendar {
    let mut out = Vec::new();
    for year in years {
        for &(month, day, name) in EC_FIXED {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                out.push(Holiday::new(date, name));
            }
        }
        if let Some(easter) = easter_sunday(year) {
            out.push(Holiday::new(easter - Duration::days(48), "Carnival"));
            out.push(Holiday::new(easter - Duration::days(47), "Carnival"));
            out.push(Holiday::new(easter - Duration::days(2), "Good Friday"));
        }
    }
    out.into_iter().collect()
}

//! Calendar helpers for sources that only report day-of-month.
//!
//! Observation tables list rows newest first, starting from "now", so a day
//! larger than today's must belong to the previous month. This holds only
//! while a page never spans more than one month boundary.

use chrono::{Datelike, NaiveDate};

/// Full date for `day`, relative to `today`.
///
/// Returns `None` when the inferred date does not exist (day 0, or e.g. the
/// 31st inferred into a 30-day month).
pub fn resolve_day_of_month(day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if day <= today.day() {
        (today.year(), today.month())
    } else if today.month() > 1 {
        (today.year(), today.month() - 1)
    } else {
        (today.year() - 1, 12)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Timestamp key for a table row: `"YYYY-MM-DD hh:mm"`.
pub fn row_timestamp_key(day: u32, time: &str, today: NaiveDate) -> Option<String> {
    let date = resolve_day_of_month(day, today)?;
    Some(format!("{} {}", date.format("%Y-%m-%d"), time))
}

/// Key for once-per-day snapshots, month-day-year.
pub fn daily_key(today: NaiveDate) -> String {
    today.format("%m-%d-%Y").to_string()
}

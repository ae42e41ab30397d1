//! Date normalization
//!
//! Every record stream (diet, exercise, lifestyle, labs) is aligned on a
//! date-only key. The convention is UTC throughout:
//! - timestamps carrying an offset are converted to UTC before truncation
//! - timestamps without an offset are read as UTC
//! - bare numbers are epoch milliseconds
//!
//! Unparsable input normalizes to `None`; callers skip it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of the date keys produced by [`normalize`]
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Naive layouts accepted besides RFC 3339 / RFC 2822
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Any timestamp-like value an upstream service may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateLike {
    /// Calendar date ("2024-01-15")
    Date(NaiveDate),
    /// RFC 3339 instant ("2024-01-15T08:30:00.000Z")
    Instant(DateTime<Utc>),
    /// Epoch milliseconds
    Timestamp(f64),
    /// Anything else; parsed leniently
    Text(String),
}

impl From<NaiveDate> for DateLike {
    fn from(date: NaiveDate) -> Self {
        DateLike::Date(date)
    }
}

impl From<DateTime<Utc>> for DateLike {
    fn from(instant: DateTime<Utc>) -> Self {
        DateLike::Instant(instant)
    }
}

impl From<i64> for DateLike {
    fn from(millis: i64) -> Self {
        DateLike::Timestamp(millis as f64)
    }
}

impl From<&str> for DateLike {
    fn from(text: &str) -> Self {
        DateLike::Text(text.to_string())
    }
}

impl From<String> for DateLike {
    fn from(text: String) -> Self {
        DateLike::Text(text)
    }
}

/// Normalize a date-like value to its ISO date key (`YYYY-MM-DD`, UTC)
pub fn normalize(input: &DateLike) -> Option<String> {
    normalize_date(input).map(date_key)
}

/// Normalize a date-like value to a UTC calendar date
pub fn normalize_date(input: &DateLike) -> Option<NaiveDate> {
    parse_instant(input).map(|instant| instant.date_naive())
}

/// Parse a date-like value to a UTC instant. Bare dates map to midnight.
pub fn parse_instant(input: &DateLike) -> Option<DateTime<Utc>> {
    match input {
        DateLike::Date(date) => Some(midnight_utc(*date)),
        DateLike::Instant(instant) => Some(*instant),
        DateLike::Timestamp(millis) => {
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis.trunc() as i64)
        }
        DateLike::Text(text) => parse_text(text),
    }
}

/// Render a date as its key
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Short day label used on trend charts, e.g. "05 March"
pub fn day_label(date: NaiveDate) -> String {
    date.format("%d %B").to_string()
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    NaiveDateTime::new(date, NaiveTime::MIN).and_utc()
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(midnight_utc(date));
        }
    }

    // Numeric strings are epoch milliseconds, like bare numbers
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(|millis| parse_instant(&DateLike::Timestamp(millis)))
}

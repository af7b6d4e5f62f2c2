//! Time utilities: fixed-width `YYYY-MM-DD` / `HH:MM` parsing and
//! timezone-aware "today".
//!
//! Every date and time crossing the core boundary is a zero-padded string, so
//! lexicographic order equals chronological order. Parsing is strict about
//! that width: `9:00` is rejected even though chrono alone would accept it.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{PlanError, Result};

/// Minutes from midnight. Signed so window arithmetic can go negative.
pub type Minutes = i32;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date shape regex"));
static TIME_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("time shape regex"));

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if !DATE_SHAPE.is_match(s) {
        return Err(PlanError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| PlanError::InvalidDate(s.to_string()))
}

/// Parse an `HH:MM` time into minutes from midnight.
///
/// `field` only labels the error.
pub fn parse_minutes(field: &'static str, s: &str) -> Result<Minutes> {
    time_to_minutes(s).ok_or_else(|| PlanError::InvalidTime {
        field,
        value: s.to_string(),
    })
}

/// Lenient variant of [`parse_minutes`] for callers that treat bad input as data.
pub fn time_to_minutes(s: &str) -> Option<Minutes> {
    if !TIME_SHAPE.is_match(s) {
        return None;
    }
    let t = NaiveTime::parse_from_str(s, TIME_FORMAT).ok()?;
    Some((t.hour() * 60 + t.minute()) as Minutes)
}

pub fn is_valid_time(s: &str) -> bool {
    time_to_minutes(s).is_some()
}

/// Format minutes from midnight as `HH:MM`, clamped to `00:00..=23:59`.
pub fn format_minutes(minutes: Minutes) -> String {
    let m = minutes.clamp(0, 24 * 60 - 1);
    format!("{:02}:{:02}", m / 60, m % 60)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Three-letter weekday label used in plan conflict descriptions ("Mon").
pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Whole days from `from` to `to`, computed from elapsed hours and rounded.
///
/// Rounding keeps the count stable if the endpoints ever carry a DST shift.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let hours = (to.and_time(NaiveTime::MIN) - from.and_time(NaiveTime::MIN)).num_hours();
    (hours as f64 / 24.0).round() as i64
}

/// Current wall-clock time in an IANA timezone. `""` and `"Local"` mean the
/// system zone.
pub fn now_in_timezone(tz: &str) -> Result<NaiveDateTime> {
    if tz.is_empty() || tz == "Local" {
        return Ok(Local::now().naive_local());
    }
    let tz: Tz = tz
        .parse()
        .map_err(|_| PlanError::InvalidTimezone(tz.to_string()))?;
    Ok(Utc::now().with_timezone(&tz).naive_local())
}

/// Today's date in the given timezone (see [`now_in_timezone`]).
pub fn today_in_timezone(tz: &str) -> Result<NaiveDate> {
    Ok(now_in_timezone(tz)?.date())
}

pub fn is_valid_timezone(tz: &str) -> bool {
    tz.is_empty() || tz == "Local" || tz.parse::<Tz>().is_ok()
}

/// Minute-of-day for a wall-clock time.
pub fn minute_of_day(t: NaiveDateTime) -> Minutes {
    (t.hour() * 60 + t.minute()) as Minutes
}

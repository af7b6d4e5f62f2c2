//! Recurrence rules and the "is this task due on that date" resolver.
//!
//! The resolver is total: malformed stored data (a bad `last_done`, a day 0,
//! occurrence 9) resolves to "not due" rather than an error.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::time::{days_between, parse_date};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    Daily,
    /// Due on any listed weekday. Empty means never.
    Weekly { weekdays: Vec<Weekday> },
    /// Due once `interval_days` have passed since `last_done`.
    #[serde(rename = "n_days")]
    EveryNDays { interval_days: u32 },
    /// Never scheduled automatically.
    AdHoc,
    /// Day-of-month. Months without that day are skipped, not clamped.
    MonthlyDate { month_day: u32 },
    /// Nth weekday of the month; `occurrence` is 1..=5, or -1 for the last one.
    MonthlyDay { weekday: Weekday, occurrence: i8 },
    /// Month + day. Feb 29 only matches in leap years.
    Yearly { month: u32, day: u32 },
    /// Monday to Friday.
    Weekdays,
}

/// Occurrence value meaning "last such weekday of the month".
pub const LAST_OCCURRENCE: i8 = -1;

impl Recurrence {
    /// Interval used to normalise lateness. Only every-N-days rules carry one;
    /// everything else (and a zero interval) counts as 1.
    pub fn lateness_interval(&self) -> u32 {
        match self {
            Recurrence::EveryNDays { interval_days } if *interval_days > 0 => *interval_days,
            _ => 1,
        }
    }

    /// Whether this rule lands on `date`, given the task's last completion.
    pub fn is_due(&self, date: NaiveDate, last_done: Option<&str>) -> bool {
        match self {
            Recurrence::Daily => true,
            Recurrence::Weekly { weekdays } => weekdays.contains(&date.weekday()),
            Recurrence::EveryNDays { interval_days } => {
                let Some(last) = last_done else {
                    return true;
                };
                match parse_date(last) {
                    Ok(last) => days_between(last, date) >= i64::from(*interval_days),
                    Err(_) => false,
                }
            }
            Recurrence::AdHoc => false,
            Recurrence::MonthlyDate { month_day } => date.day() == *month_day,
            Recurrence::MonthlyDay {
                weekday,
                occurrence,
            } => date.weekday() == *weekday && occurrence_matches(date, *occurrence),
            Recurrence::Yearly { month, day } => date.month() == *month && date.day() == *day,
            Recurrence::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }

    /// Conservative "can these two rules fall on the same day" check used by
    /// the fixed-appointment overlap scan.
    ///
    /// Daily coincides with everything. Two weekly rules coincide only when
    /// their weekday sets intersect (an empty set counts as coinciding). Every
    /// other pairing is assumed to coincide.
    pub fn may_coincide(&self, other: &Recurrence) -> bool {
        match (self, other) {
            (Recurrence::Daily, _) | (_, Recurrence::Daily) => true,
            (Recurrence::Weekly { weekdays: a }, Recurrence::Weekly { weekdays: b }) => {
                a.is_empty() || b.is_empty() || a.iter().any(|d| b.contains(d))
            }
            _ => true,
        }
    }
}

/// Week-of-month check for `MonthlyDay`.
fn occurrence_matches(date: NaiveDate, occurrence: i8) -> bool {
    match occurrence {
        LAST_OCCURRENCE => {
            let next = date + Duration::days(7);
            next.month() != date.month()
        }
        1..=5 => ((date.day() - 1) / 7 + 1) == occurrence as u32,
        _ => false,
    }
}

/// Whether `task` is due on `date` according to its recurrence.
pub fn is_due(task: &Task, date: NaiveDate) -> bool {
    task.recurrence.is_due(date, task.last_done())
}

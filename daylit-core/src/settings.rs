//! Day boundaries and planning defaults.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::time::{self, Minutes};

pub const DEFAULT_DAY_START: &str = "07:00";
pub const DEFAULT_DAY_END: &str = "22:00";
pub const DEFAULT_BLOCK_MIN: Minutes = 30;
/// Use the system zone.
pub const LOCAL_TIMEZONE: &str = "Local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub day_start: String,
    pub day_end: String,
    pub default_block_min: Minutes,
    pub timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            day_start: DEFAULT_DAY_START.to_string(),
            day_end: DEFAULT_DAY_END.to_string(),
            default_block_min: DEFAULT_BLOCK_MIN,
            timezone: LOCAL_TIMEZONE.to_string(),
        }
    }
}

impl Settings {
    /// Check every field; the first problem wins.
    ///
    /// A day end at or before the day start is allowed here. The allocator
    /// produces an empty plan for it and the plan validator reports it.
    pub fn validate(&self) -> Result<()> {
        time::parse_minutes("day_start", &self.day_start)?;
        time::parse_minutes("day_end", &self.day_end)?;
        if self.default_block_min <= 0 {
            return Err(PlanError::InvalidTime {
                field: "default_block_min",
                value: self.default_block_min.to_string(),
            });
        }
        if !time::is_valid_timezone(&self.timezone) {
            return Err(PlanError::InvalidTimezone(self.timezone.clone()));
        }
        Ok(())
    }

    pub fn today(&self) -> Result<NaiveDate> {
        time::today_in_timezone(&self.timezone)
    }

    pub fn now_minute(&self) -> Result<Minutes> {
        time::now_in_timezone(&self.timezone).map(time::minute_of_day)
    }
}

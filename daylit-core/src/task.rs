//! Task catalog model.

use serde::{Deserialize, Serialize};

use crate::lifecycle::Lifecycle;
use crate::recurrence::Recurrence;
use crate::time::{Minutes, time_to_minutes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Must occupy a fixed wall-clock interval.
    Appointment,
    /// Duration only; placed into whatever time is free.
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyBand {
    Low,
    Medium,
    High,
}

pub const DEFAULT_PRIORITY: u8 = 3;

/// A thing that may occupy time.
///
/// Time-of-day fields are kept as the raw `HH:MM` strings the user entered so
/// the validator can report malformed values instead of losing them at load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub kind: TaskKind,

    /// Minutes. Authoritative for flexible tasks; derived for appointments.
    pub duration_min: Minutes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_end: Option<String>,

    pub recurrence: Recurrence,

    /// 1-5, lower is scheduled first.
    pub priority: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_band: Option<EnergyBand>,

    pub active: bool,

    /// `YYYY-MM-DD` of the last completion; `None` means never done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_done: Option<String>,

    #[serde(default)]
    pub success_streak: u32,
    #[serde(default)]
    pub avg_actual_duration_min: f64,

    #[serde(default)]
    pub lifecycle: Lifecycle,
}

/// Treat `Some("")` the same as `None`.
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl Task {
    /// A flexible daily task.
    pub fn flexible(id: impl Into<String>, name: impl Into<String>, duration_min: Minutes) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: TaskKind::Flexible,
            duration_min,
            earliest_start: None,
            latest_end: None,
            fixed_start: None,
            fixed_end: None,
            recurrence: Recurrence::Daily,
            priority: DEFAULT_PRIORITY,
            energy_band: None,
            active: true,
            last_done: None,
            success_streak: 0,
            avg_actual_duration_min: 0.0,
            lifecycle: Lifecycle::Live,
        }
    }

    /// A daily appointment. The duration is derived from the fixed times
    /// (0 if either does not parse or the end precedes the start).
    pub fn appointment(
        id: impl Into<String>,
        name: impl Into<String>,
        fixed_start: impl Into<String>,
        fixed_end: impl Into<String>,
    ) -> Self {
        let fixed_start = fixed_start.into();
        let fixed_end = fixed_end.into();
        let duration = match (time_to_minutes(&fixed_start), time_to_minutes(&fixed_end)) {
            (Some(s), Some(e)) if e >= s => e - s,
            _ => 0,
        };
        let mut task = Self::flexible(id, name, duration);
        task.kind = TaskKind::Appointment;
        task.fixed_start = Some(fixed_start);
        task.fixed_end = Some(fixed_end);
        task
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn with_window(mut self, earliest_start: Option<&str>, latest_end: Option<&str>) -> Self {
        self.earliest_start = earliest_start.map(str::to_string);
        self.latest_end = latest_end.map(str::to_string);
        self
    }

    pub fn with_last_done(mut self, date: impl Into<String>) -> Self {
        self.last_done = Some(date.into());
        self
    }

    pub fn with_energy(mut self, band: EnergyBand) -> Self {
        self.energy_band = Some(band);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }

    pub fn earliest_start(&self) -> Option<&str> {
        non_empty(&self.earliest_start)
    }

    pub fn latest_end(&self) -> Option<&str> {
        non_empty(&self.latest_end)
    }

    pub fn fixed_start(&self) -> Option<&str> {
        non_empty(&self.fixed_start)
    }

    pub fn fixed_end(&self) -> Option<&str> {
        non_empty(&self.fixed_end)
    }

    pub fn last_done(&self) -> Option<&str> {
        non_empty(&self.last_done)
    }

    /// Both fixed times, when set.
    pub fn fixed_window(&self) -> Option<(&str, &str)> {
        Some((self.fixed_start()?, self.fixed_end()?))
    }

    /// An appointment with both fixed times present. Appointments missing one
    /// of them are planned as flexible tasks instead.
    pub fn is_fixed_appointment(&self) -> bool {
        self.kind == TaskKind::Appointment && self.fixed_window().is_some()
    }
}

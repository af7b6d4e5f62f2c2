//! Day plans, their slots, and the revision lifecycle.
//!
//! Revision lineage: `Draft -> Accepted -> Superseded`. An accepted revision is
//! never edited; changing it produces a new draft with the next number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::lifecycle::Lifecycle;
use crate::time::{Minutes, time_to_minutes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Planned,
    Accepted,
    Done,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRating {
    OnTrack,
    TooMuch,
    Unnecessary,
}

impl std::str::FromStr for FeedbackRating {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "on_track" => Ok(FeedbackRating::OnTrack),
            "too_much" => Ok(FeedbackRating::TooMuch),
            "unnecessary" => Ok(FeedbackRating::Unnecessary),
            other => Err(format!(
                "invalid rating: {other} (use on_track, too_much, or unnecessary)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: FeedbackRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One timed occupation of a plan by a task. `start`/`end` are `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: String,
    pub end: String,
    pub task_id: String,
    pub status: SlotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl Slot {
    pub fn planned(
        start: impl Into<String>,
        end: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            task_id: task_id.into(),
            status: SlotStatus::Planned,
            feedback: None,
            lifecycle: Lifecycle::Live,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }

    /// `(start, end)` in minutes, if both parse.
    pub fn minutes(&self) -> Option<(Minutes, Minutes)> {
        Some((time_to_minutes(&self.start)?, time_to_minutes(&self.end)?))
    }

    /// Length in minutes; `None` for malformed or inverted slots.
    pub fn duration(&self) -> Option<Minutes> {
        let (s, e) = self.minutes()?;
        (e >= s).then_some(e - s)
    }

    fn is_committed(&self) -> bool {
        !self.is_deleted() && matches!(self.status, SlotStatus::Accepted | SlotStatus::Done)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RevisionState {
    #[default]
    Draft,
    Accepted { at: DateTime<Utc> },
    Superseded { at: DateTime<Utc> },
}

/// One date's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// 0 until the store numbers it; saved revisions start at 1.
    pub revision: u32,
    #[serde(default)]
    pub state: RevisionState,
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl DayPlan {
    pub fn new(date: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            date: date.into(),
            revision: 0,
            state: RevisionState::Draft,
            slots,
            lifecycle: Lifecycle::Live,
        }
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.state, RevisionState::Accepted { .. })
    }

    /// Draft -> Accepted. Planned slots become accepted.
    pub fn accept(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.state != RevisionState::Draft {
            return Err(PlanError::NotDraft {
                date: self.date.clone(),
                revision: self.revision,
            });
        }
        for slot in self.slots.iter_mut().filter(|s| s.status == SlotStatus::Planned) {
            slot.status = SlotStatus::Accepted;
        }
        self.state = RevisionState::Accepted { at };
        Ok(())
    }

    /// Replace this plan's slots.
    ///
    /// A draft is edited in place and `None` is returned. An accepted revision
    /// is left untouched apart from being marked superseded, and the new draft
    /// (next revision number) is returned for the caller to store.
    pub fn revise(&mut self, slots: Vec<Slot>, at: DateTime<Utc>) -> Result<Option<DayPlan>> {
        match self.state {
            RevisionState::Draft => {
                self.slots = slots;
                Ok(None)
            }
            RevisionState::Accepted { .. } => {
                self.state = RevisionState::Superseded { at };
                Ok(Some(
                    DayPlan::new(self.date.clone(), slots).with_revision(self.revision + 1),
                ))
            }
            RevisionState::Superseded { .. } => Err(PlanError::SupersededRevision {
                date: self.date.clone(),
                revision: self.revision,
            }),
        }
    }

    /// Live slots only.
    pub fn live_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| !s.is_deleted())
    }

    /// The accepted/done slot covering `minute` (half-open `[start, end)`).
    pub fn current_slot(&self, minute: Minutes) -> Option<&Slot> {
        self.slots.iter().filter(|s| s.is_committed()).find(|s| {
            s.minutes()
                .is_some_and(|(start, end)| start <= minute && minute < end)
        })
    }

    /// Index of the most recent accepted/done slot that has finished by
    /// `minute` and has no feedback yet.
    pub fn feedback_target(&self, minute: Minutes) -> Option<usize> {
        self.slots.iter().enumerate().rev().find_map(|(i, s)| {
            let finished = s.minutes().is_some_and(|(_, end)| end <= minute);
            (s.is_committed() && s.feedback.is_none() && finished).then_some(i)
        })
    }
}

//! Error types for daylit-core.
//!
//! Only malformed *call inputs* are errors. Problems found inside a task
//! catalog or a plan are reported as `Conflict` values instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A date that is not `YYYY-MM-DD` (or not a real calendar day).
    #[error("invalid date format: {0:?}")]
    InvalidDate(String),

    /// A time that is not zero-padded 24h `HH:MM`.
    #[error("invalid {field} time: {value:?}")]
    InvalidTime { field: &'static str, value: String },

    /// Unknown IANA timezone name.
    #[error("invalid timezone: {0:?}")]
    InvalidTimezone(String),

    /// Accepting a revision that is not a draft.
    #[error("revision {revision} of {date} is not a draft")]
    NotDraft { date: String, revision: u32 },

    /// Editing a revision that has already been replaced by a newer one.
    #[error("revision {revision} of {date} has been superseded")]
    SupersededRevision { date: String, revision: u32 },

    /// Invalid soft-delete transition.
    #[error("cannot {action} a record that is {state}")]
    Lifecycle { action: &'static str, state: &'static str },
}

pub type Result<T> = std::result::Result<T, PlanError>;

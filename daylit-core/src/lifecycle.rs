//! Soft-delete lifecycle shared by tasks, slots and plans.
//!
//! `Live -> Deleted -> Restored -> Deleted -> ...`. The core only ever asks
//! [`Lifecycle::is_deleted`]; the transitions exist for the storage side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Live,
    Deleted { at: DateTime<Utc> },
    Restored { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::Deleted { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Lifecycle::Live => "live",
            Lifecycle::Deleted { .. } => "deleted",
            Lifecycle::Restored { .. } => "restored",
        }
    }

    pub fn delete(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.is_deleted() {
            return Err(PlanError::Lifecycle {
                action: "delete",
                state: self.label(),
            });
        }
        *self = Lifecycle::Deleted { at };
        Ok(())
    }

    pub fn restore(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.is_deleted() {
            return Err(PlanError::Lifecycle {
                action: "restore",
                state: self.label(),
            });
        }
        *self = Lifecycle::Restored { at };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn delete_then_restore() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let mut l = Lifecycle::default();
        assert!(!l.is_deleted());

        l.delete(at).unwrap();
        assert!(l.is_deleted());
        assert!(l.delete(at).is_err());

        l.restore(at).unwrap();
        assert_eq!(l, Lifecycle::Restored { at });
        assert!(!l.is_deleted());

        // restored records can be deleted again
        l.delete(at).unwrap();
        assert!(l.is_deleted());
    }

    #[test]
    fn restoring_live_record_fails() {
        let mut l = Lifecycle::Live;
        let err = l.restore(Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "cannot restore a record that is live");
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_string(&Lifecycle::Live).unwrap();
        assert_eq!(json, r#"{"state":"live"}"#);
    }
}

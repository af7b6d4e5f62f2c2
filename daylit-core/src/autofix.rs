//! Auto-fix for duplicate task names.
//!
//! For each duplicate-name conflict, keep the live task with the
//! lexicographically smallest ID and hand every other live duplicate to the
//! caller's delete callback. ID order is a stable heuristic, not creation
//! order. A failed delete is recorded and processing continues.

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::task::Task;
use crate::validation::{Conflict, ConflictKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelete {
    pub task_id: String,
    pub error: String,
}

/// What the fixer did for one duplicate-name conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAction {
    pub name: String,
    pub kept_id: String,
    pub deleted: Vec<String>,
    pub failed: Vec<FailedDelete>,
    pub source: Conflict,
}

impl FixAction {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn describe(&self) -> String {
        let failed_ids: Vec<&str> = self.failed.iter().map(|f| f.task_id.as_str()).collect();
        if self.deleted.is_empty() {
            return format!(
                "Failed to remove duplicates for \"{}\": [{}]",
                self.name,
                failed_ids.join(", ")
            );
        }
        let mut msg = format!(
            "Removed {} duplicate task(s) with name \"{}\" (kept ID: {}, removed: [{}])",
            self.deleted.len(),
            self.name,
            self.kept_id,
            self.deleted.join(", ")
        );
        if !failed_ids.is_empty() {
            msg.push_str(&format!(" (failed to remove: [{}])", failed_ids.join(", ")));
        }
        msg
    }
}

/// Resolve duplicate-name conflicts through `delete`.
///
/// Non-duplicate conflicts are ignored. Conflicts whose IDs resolve to fewer
/// than two live tasks produce no action.
pub fn auto_fix_duplicate_tasks<F, E>(
    conflicts: &[Conflict],
    tasks: &[Task],
    mut delete: F,
) -> Vec<FixAction>
where
    F: FnMut(&str) -> Result<(), E>,
    E: Display,
{
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut actions = Vec::new();

    for conflict in conflicts.iter().filter(|c| c.kind == ConflictKind::DuplicateTaskName) {
        let mut dupes: Vec<&Task> = conflict
            .task_ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .filter(|t| !t.is_deleted())
            .collect();
        if dupes.len() <= 1 {
            continue;
        }
        dupes.sort_by(|a, b| a.id.cmp(&b.id));
        dupes.dedup_by(|a, b| a.id == b.id);
        if dupes.len() <= 1 {
            continue;
        }

        let keep = dupes[0];
        let mut deleted = Vec::new();
        let mut failed = Vec::new();

        for t in &dupes[1..] {
            match delete(&t.id) {
                Ok(()) => deleted.push(t.id.clone()),
                Err(e) => {
                    warn!(task_id = %t.id, error = %e, "failed to delete duplicate task");
                    failed.push(FailedDelete {
                        task_id: t.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        actions.push(FixAction {
            name: keep.name.clone(),
            kept_id: keep.id.clone(),
            deleted,
            failed,
            source: conflict.clone(),
        });
    }

    actions
}

//! Conflict validator for task catalogs and day plans.
//!
//! Validation is a pure report: inputs are borrowed immutably and every
//! problem comes back as a [`Conflict`], never as an error.
//!
//! Both overlap scans sort by start time and compare every pair (O(n²)).
//! A day holds tens of items, and the pair order defines report order.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::plan::{DayPlan, Slot};
use crate::recurrence::is_due;
use crate::task::Task;
use crate::time::{Minutes, is_valid_time, parse_date, time_to_minutes, weekday_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    OverlappingFixedTasks,
    OverlappingSlots,
    ExceedsWakingWindow,
    Overcommitted,
    MissingTaskId,
    DuplicateTaskName,
    #[serde(rename = "invalid_datetime")]
    InvalidDateTime,
}

/// A detected problem in a catalog or plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub description: String,
    /// Plan date, when the conflict belongs to a plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Display names of the tasks involved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    /// IDs of the tasks involved; consumed by the auto-fixer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<String>,
}

impl Conflict {
    pub fn new(kind: ConflictKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            date: None,
            items: Vec::new(),
            time_range: None,
            task_ids: Vec::new(),
        }
    }

    fn on_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }

    fn with_time_range(mut self, start: &str, end: &str) -> Self {
        self.time_range = Some(format!("{start}-{end}"));
        self
    }

    fn with_task_ids(mut self, ids: Vec<String>) -> Self {
        self.task_ids = ids;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub conflicts: Vec<Conflict>,
}

impl ValidationResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn of_kind(&self, kind: ConflictKind) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(move |c| c.kind == kind)
    }

    /// Human-readable list of conflict descriptions.
    pub fn format_report(&self) -> String {
        if !self.has_conflicts() {
            return "No conflicts detected.".to_string();
        }
        let mut report = String::from("Conflicts detected:\n");
        for c in &self.conflicts {
            report.push_str("- ");
            report.push_str(&c.description);
            report.push('\n');
        }
        report
    }

    fn push(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }
}

/// Half-open overlap of two `HH:MM` ranges. Any unparseable bound means no
/// overlap.
pub fn times_overlap(start1: &str, end1: &str, start2: &str, end2: &str) -> bool {
    let (Some(s1), Some(e1), Some(s2), Some(e2)) = (
        time_to_minutes(start1),
        time_to_minutes(end1),
        time_to_minutes(start2),
        time_to_minutes(end2),
    ) else {
        return false;
    };
    s1 < e2 && s2 < e1
}

/// Check a task catalog.
///
/// With `date`, the appointment overlap scan only considers appointments due
/// on that date; the name and time-field checks always cover every live task.
pub fn validate_tasks(tasks: &[Task], date: Option<NaiveDate>) -> ValidationResult {
    let mut result = ValidationResult::default();
    let live: Vec<&Task> = tasks.iter().filter(|t| !t.is_deleted()).collect();

    check_duplicate_names(&live, &mut result);
    for task in &live {
        check_task_times(task, &mut result);
    }
    check_fixed_overlaps(&live, date, &mut result);

    debug!(tasks = live.len(), conflicts = result.conflicts.len(), "validated tasks");
    result
}

fn check_duplicate_names(live: &[&Task], result: &mut ValidationResult) {
    let mut by_name: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for t in live.iter().filter(|t| !t.name.is_empty()) {
        by_name.entry(t.name.as_str()).or_default().push(t.id.clone());
    }

    for (name, ids) in by_name {
        if ids.len() > 1 {
            result.push(
                Conflict::new(
                    ConflictKind::DuplicateTaskName,
                    format!("Duplicate task name: \"{name}\" (IDs: {})", ids.join(", ")),
                )
                .with_items(vec![name.to_string()])
                .with_task_ids(ids),
            );
        }
    }
}

fn check_task_times(task: &Task, result: &mut ValidationResult) {
    let fields = [
        ("earliest_start", task.earliest_start()),
        ("latest_end", task.latest_end()),
        ("fixed_start", task.fixed_start()),
        ("fixed_end", task.fixed_end()),
    ];
    for (field, value) in fields {
        let Some(value) = value else { continue };
        if !is_valid_time(value) {
            result.push(
                Conflict::new(
                    ConflictKind::InvalidDateTime,
                    format!("Task \"{}\" has invalid {field} time: {value}", task.name),
                )
                .with_items(vec![task.name.clone()])
                .with_task_ids(vec![task.id.clone()]),
            );
        }
    }

    if let Some((start, end)) = task.fixed_window() {
        if let (Some(s), Some(e)) = (time_to_minutes(start), time_to_minutes(end)) {
            if e < s {
                result.push(
                    Conflict::new(
                        ConflictKind::InvalidDateTime,
                        format!(
                            "Task \"{}\" has end time ({end}) before start time ({start})",
                            task.name
                        ),
                    )
                    .with_items(vec![task.name.clone()])
                    .with_task_ids(vec![task.id.clone()]),
                );
            }
        }
    }
}

fn check_fixed_overlaps(live: &[&Task], date: Option<NaiveDate>, result: &mut ValidationResult) {
    let mut fixed: Vec<(&Task, &str, &str)> = live
        .iter()
        .filter(|t| t.active && t.is_fixed_appointment())
        .filter(|t| date.is_none_or(|d| is_due(t, d)))
        .filter_map(|&t| {
            let (s, e) = t.fixed_window()?;
            Some((t, s, e))
        })
        .collect();
    fixed.sort_by(|a, b| a.1.cmp(b.1));

    for i in 0..fixed.len() {
        for j in (i + 1)..fixed.len() {
            let (t1, s1, e1) = fixed[i];
            let (t2, s2, e2) = fixed[j];
            if !times_overlap(s1, e1, s2, e2) {
                continue;
            }
            if !t1.recurrence.may_coincide(&t2.recurrence) {
                continue;
            }
            result.push(
                Conflict::new(
                    ConflictKind::OverlappingFixedTasks,
                    format!(
                        "Appointments overlap: \"{}\" ({s1}-{e1}) and \"{}\" ({s2}-{e2})",
                        t1.name, t2.name
                    ),
                )
                .with_items(vec![t1.name.clone(), t2.name.clone()])
                .with_time_range(s1, e1)
                .with_task_ids(vec![t1.id.clone(), t2.id.clone()]),
            );
        }
    }
}

/// Check a generated or stored plan against the catalog and day boundaries.
pub fn validate_plan(
    plan: &DayPlan,
    tasks: &[Task],
    day_start: &str,
    day_end: &str,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    let task_map: HashMap<&str, &Task> = tasks
        .iter()
        .filter(|t| !t.is_deleted())
        .map(|t| (t.id.as_str(), t))
        .collect();

    let Ok(plan_date) = parse_date(&plan.date) else {
        result.push(
            Conflict::new(
                ConflictKind::InvalidDateTime,
                format!("Invalid plan date: {}", plan.date),
            )
            .on_date(&plan.date),
        );
        return result;
    };
    let day = weekday_label(plan_date);

    // A malformed boundary is reported and then counted as midnight.
    let start_min = time_to_minutes(day_start).unwrap_or_else(|| {
        result.push(Conflict::new(
            ConflictKind::InvalidDateTime,
            format!("Invalid day start time: {day_start}"),
        ));
        0
    });
    let end_min = time_to_minutes(day_end).unwrap_or_else(|| {
        result.push(Conflict::new(
            ConflictKind::InvalidDateTime,
            format!("Invalid day end time: {day_end}"),
        ));
        0
    });

    let window = end_min - start_min;
    if window <= 0 {
        result.push(Conflict::new(
            ConflictKind::InvalidDateTime,
            format!(
                "Invalid waking window: day_start ({day_start}) must be before day_end ({day_end})"
            ),
        ));
        return result;
    }

    let live: Vec<&Slot> = plan.live_slots().collect();
    let mut total: Minutes = 0;

    for slot in &live {
        if !is_valid_time(&slot.start) {
            result.push(
                Conflict::new(
                    ConflictKind::InvalidDateTime,
                    format!("{day}: Invalid slot start time: {}", slot.start),
                )
                .on_date(&plan.date),
            );
        }
        if !is_valid_time(&slot.end) {
            result.push(
                Conflict::new(
                    ConflictKind::InvalidDateTime,
                    format!("{day}: Invalid slot end time: {}", slot.end),
                )
                .on_date(&plan.date),
            );
        }

        if !task_map.contains_key(slot.task_id.as_str()) {
            result.push(
                Conflict::new(
                    ConflictKind::MissingTaskId,
                    format!("{day}: Slot references missing task ID: {}", slot.task_id),
                )
                .on_date(&plan.date)
                .with_task_ids(vec![slot.task_id.clone()]),
            );
        }

        let Some((s, e)) = slot.minutes() else {
            continue;
        };
        if e < s {
            result.push(
                Conflict::new(
                    ConflictKind::InvalidDateTime,
                    format!(
                        "{day}: Slot end time '{}' is before start time '{}'",
                        slot.end, slot.start
                    ),
                )
                .on_date(&plan.date),
            );
            continue;
        }
        total += e - s;
    }

    check_slot_overlaps(&live, &task_map, &plan.date, &day, &mut result);

    let hours = |m: Minutes| f64::from(m) / 60.0;
    if total > window {
        result.push(
            Conflict::new(
                ConflictKind::ExceedsWakingWindow,
                format!(
                    "{day}: {:.1}h scheduled exceeds {:.1}h waking window",
                    hours(total),
                    hours(window)
                ),
            )
            .on_date(&plan.date),
        );
    } else if total * 5 >= window * 4 {
        // 80%..=100% of the window, compared in integers
        result.push(
            Conflict::new(
                ConflictKind::Overcommitted,
                format!(
                    "{day}: {:.1}h scheduled in {:.1}h waking window (>=80% capacity)",
                    hours(total),
                    hours(window)
                ),
            )
            .on_date(&plan.date),
        );
    }

    debug!(
        date = %plan.date,
        slots = live.len(),
        planned_minutes = total,
        window_minutes = window,
        conflicts = result.conflicts.len(),
        "validated plan"
    );
    result
}

fn check_slot_overlaps(
    live: &[&Slot],
    task_map: &HashMap<&str, &Task>,
    date: &str,
    day: &str,
    result: &mut ValidationResult,
) {
    let mut sorted: Vec<&Slot> = live.to_vec();
    sorted.sort_by(|a, b| a.start.cmp(&b.start));

    let name_of = |slot: &Slot| {
        task_map
            .get(slot.task_id.as_str())
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    };

    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len() {
            let (a, b) = (sorted[i], sorted[j]);
            if !times_overlap(&a.start, &a.end, &b.start, &b.end) {
                continue;
            }
            let (n1, n2) = (name_of(a), name_of(b));
            result.push(
                Conflict::new(
                    ConflictKind::OverlappingSlots,
                    format!("{day}: {}-{} \"{n1}\" overlaps \"{n2}\"", a.start, a.end),
                )
                .on_date(date)
                .with_items(vec![n1, n2])
                .with_time_range(&a.start, &a.end)
                .with_task_ids(vec![a.task_id.clone(), b.task_id.clone()]),
            );
        }
    }
}

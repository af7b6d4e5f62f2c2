//! Time-block allocator: turns a task catalog into one day's plan.
//!
//! Algorithm (deterministic, first-fit, no backtracking):
//! 1) keep active, live tasks
//! 2) due appointments with both fixed times are placed verbatim, even when
//!    they overlap each other (that is the validator's business)
//! 3) everything else that is due is a flexible candidate, ranked by
//!    priority ASC then lateness DESC
//! 4) each candidate takes the first free interval it fits, in time order
//! 5) candidates that fit nowhere are left out of the plan

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::interval::{FreeIntervals, Interval};
use crate::plan::{DayPlan, Slot};
use crate::recurrence::is_due;
use crate::task::Task;
use crate::time::{
    Minutes, days_between, format_date, format_minutes, parse_date, parse_minutes, time_to_minutes,
};

/// A generated plan plus the due flexible tasks that did not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub plan: DayPlan,
    /// Task IDs in ranking order.
    pub unplaced: Vec<String>,
}

/// Build the plan for `date` between `day_start` and `day_end`.
///
/// Fails only when `date`, `day_start` or `day_end` is malformed. Flexible
/// tasks that cannot be placed are silently omitted; use [`schedule_day`] to
/// find out which.
pub fn generate_plan(
    date: &str,
    tasks: &[Task],
    day_start: &str,
    day_end: &str,
) -> Result<DayPlan> {
    schedule_day(date, tasks, day_start, day_end).map(|s| s.plan)
}

/// Same as [`generate_plan`], also reporting unplaced tasks.
pub fn schedule_day(
    date: &str,
    tasks: &[Task],
    day_start: &str,
    day_end: &str,
) -> Result<Schedule> {
    let plan_date = parse_date(date)?;
    let start = parse_minutes("day start", day_start)?;
    let end = parse_minutes("day end", day_end)?;

    let live: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.active && !t.is_deleted())
        .collect();

    let (appointments, flexible): (Vec<&Task>, Vec<&Task>) =
        live.into_iter().partition(|t| t.is_fixed_appointment());

    let mut fixed_slots: Vec<Slot> = appointments
        .into_iter()
        .filter(|t| is_due(t, plan_date))
        .filter_map(|t| {
            let (s, e) = t.fixed_window()?;
            Some(Slot::planned(s, e, t.id.clone()))
        })
        .collect();
    fixed_slots.sort_by(|a, b| a.start.cmp(&b.start));

    let busy: Vec<Interval> = fixed_slots
        .iter()
        .filter_map(|s| s.minutes())
        .map(|(s, e)| Interval::new(s, e))
        .collect();
    let mut free = FreeIntervals::between(start, end, &busy);
    debug!(
        date = %format_date(plan_date),
        fixed = fixed_slots.len(),
        free_intervals = free.len(),
        free_minutes = free.total(),
        "placed fixed appointments"
    );

    let mut candidates: Vec<&Task> = flexible
        .into_iter()
        .filter(|t| is_due(t, plan_date))
        .collect();
    rank_candidates(&mut candidates, plan_date);

    let mut placed_ids: HashSet<&str> = HashSet::new();
    let mut flexible_slots = Vec::new();
    let mut unplaced = Vec::new();

    for task in candidates {
        if placed_ids.contains(task.id.as_str()) {
            continue;
        }

        let placement = free
            .iter()
            .enumerate()
            .filter(|(_, iv)| fits(task, iv))
            .find_map(|(i, iv)| place(task, iv).map(|p| (i, p)));

        match placement {
            Some((index, placed)) => {
                free = free.carve(index, placed);
                flexible_slots.push(Slot::planned(
                    format_minutes(placed.start),
                    format_minutes(placed.end),
                    task.id.clone(),
                ));
                placed_ids.insert(task.id.as_str());
            }
            None => {
                debug!(
                    task_id = %task.id,
                    duration = task.duration_min,
                    "no free interval fits task"
                );
                unplaced.push(task.id.clone());
            }
        }
    }

    let mut slots = fixed_slots;
    slots.extend(flexible_slots);
    slots.sort_by(|a, b| a.start.cmp(&b.start));

    Ok(Schedule {
        plan: DayPlan::new(date, slots),
        unplaced,
    })
}

/// Priority ascending, then lateness descending. The sort is stable, so full
/// ties keep catalog order.
fn rank_candidates(candidates: &mut [&Task], date: NaiveDate) {
    candidates.sort_by(|a, b| {
        a.priority.cmp(&b.priority).then_with(|| {
            lateness(b, date)
                .partial_cmp(&lateness(a, date))
                .unwrap_or(Ordering::Equal)
        })
    });
}

/// How overdue a task is: days since `last_done` over the recurrence
/// interval (1 for rules without one).
///
/// Never done counts as exactly on time (1.0). An unreadable `last_done`
/// counts as 0.0.
pub fn lateness(task: &Task, date: NaiveDate) -> f64 {
    let Some(last) = task.last_done() else {
        return 1.0;
    };
    let Ok(last) = parse_date(last) else {
        return 0.0;
    };
    days_between(last, date) as f64 / f64::from(task.recurrence.lateness_interval())
}

fn bound(value: Option<&str>) -> Option<Minutes> {
    value.and_then(time_to_minutes)
}

/// Cheap pre-check: long enough, not entirely before `earliest_start`, not
/// starting at or after `latest_end`. Unparseable bounds are ignored.
fn fits(task: &Task, iv: &Interval) -> bool {
    if task.duration_min < 0 || task.duration_min > iv.len() {
        return false;
    }
    if bound(task.earliest_start()).is_some_and(|earliest| iv.end <= earliest) {
        return false;
    }
    if bound(task.latest_end()).is_some_and(|latest| iv.start >= latest) {
        return false;
    }
    true
}

/// Exact placement inside `iv`, honouring `earliest_start`/`latest_end`.
fn place(task: &Task, iv: &Interval) -> Option<Interval> {
    let start = match bound(task.earliest_start()) {
        Some(earliest) => iv.start.max(earliest),
        None => iv.start,
    };
    let end = start + task.duration_min;

    if bound(task.latest_end()).is_some_and(|latest| end > latest) {
        return None;
    }
    if end > iv.end {
        return None;
    }
    Some(Interval::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::Recurrence;
    use chrono::Weekday;

    fn slot_for<'a>(plan: &'a DayPlan, id: &str) -> Option<&'a Slot> {
        plan.slots.iter().find(|s| s.task_id == id)
    }

    #[test]
    fn rejects_malformed_inputs() {
        assert!(generate_plan("2026-13-01", &[], "09:00", "17:00").is_err());
        assert!(generate_plan("2026-01-05", &[], "9am", "17:00").is_err());
        assert!(generate_plan("2026-01-05", &[], "09:00", "25:00").is_err());
    }

    #[test]
    fn degenerate_window_is_not_an_error() {
        let tasks = vec![Task::flexible("a", "A", 30)];
        let s = schedule_day("2026-01-05", &tasks, "17:00", "09:00").unwrap();
        assert!(s.plan.slots.is_empty());
        assert_eq!(s.unplaced, vec!["a".to_string()]);
    }

    #[test]
    fn packs_flexible_tasks_from_day_start() {
        let tasks = vec![
            Task::flexible("a", "A", 60),
            Task::flexible("b", "B", 30),
        ];
        let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();
        assert_eq!(plan.slots.len(), 2);
        assert_eq!((plan.slots[0].start.as_str(), plan.slots[0].end.as_str()), ("09:00", "10:00"));
        assert_eq!((plan.slots[1].start.as_str(), plan.slots[1].end.as_str()), ("10:00", "10:30"));
        assert_eq!(plan.revision, 0);
    }

    #[test]
    fn inactive_and_deleted_tasks_are_ignored() {
        let mut deleted = Task::flexible("d", "D", 30);
        deleted.lifecycle.delete(chrono::Utc::now()).unwrap();
        let tasks = vec![Task::flexible("i", "I", 30).inactive(), deleted];
        let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();
        assert!(plan.slots.is_empty());
    }

    #[test]
    fn overlapping_appointments_pass_through() {
        let tasks = vec![
            Task::appointment("m1", "Standup", "09:00", "10:00"),
            Task::appointment("m2", "Review", "09:30", "10:30"),
        ];
        let plan = generate_plan("2026-01-05", &tasks, "08:00", "12:00").unwrap();
        assert_eq!(plan.slots.len(), 2);
        assert_eq!(slot_for(&plan, "m2").unwrap().start, "09:30");
    }

    #[test]
    fn inverted_appointment_does_not_double_book() {
        let tasks = vec![
            Task::appointment("bad", "Backwards", "11:00", "10:00"),
            Task::appointment("lunch", "Lunch", "12:00", "13:00"),
            Task::flexible("a", "A", 120),
            Task::flexible("b", "B", 120),
        ];
        let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();

        let a = slot_for(&plan, "a").unwrap();
        let b = slot_for(&plan, "b").unwrap();
        assert_eq!((a.start.as_str(), a.end.as_str()), ("09:00", "11:00"));
        assert_eq!((b.start.as_str(), b.end.as_str()), ("13:00", "15:00"));

        let flexible: Vec<&Slot> = plan.slots.iter().filter(|s| s.task_id != "bad").collect();
        for (i, x) in flexible.iter().enumerate() {
            for y in &flexible[i + 1..] {
                assert!(
                    !crate::validation::times_overlap(&x.start, &x.end, &y.start, &y.end),
                    "{}-{} overlaps {}-{}",
                    x.start,
                    x.end,
                    y.start,
                    y.end
                );
            }
        }
    }

    #[test]
    fn appointment_not_due_is_left_out() {
        let tasks = vec![Task::appointment("m", "Mon sync", "09:00", "10:00").with_recurrence(
            Recurrence::Weekly {
                weekdays: vec![Weekday::Mon],
            },
        )];
        // 2026-01-06 is a Tuesday
        let plan = generate_plan("2026-01-06", &tasks, "08:00", "12:00").unwrap();
        assert!(plan.slots.is_empty());
    }

    #[test]
    fn incomplete_appointment_is_planned_as_flexible() {
        let mut t = Task::appointment("x", "Half", "13:00", "14:00");
        t.fixed_end = None;
        t.duration_min = 45;
        let plan = generate_plan("2026-01-05", &[t], "09:00", "17:00").unwrap();
        let s = slot_for(&plan, "x").unwrap();
        assert_eq!((s.start.as_str(), s.end.as_str()), ("09:00", "09:45"));
    }

    #[test]
    fn earliest_start_shifts_placement() {
        let t = Task::flexible("gym", "Gym", 60).with_window(Some("16:00"), None);
        let plan = generate_plan("2026-01-05", &[t], "09:00", "20:00").unwrap();
        let s = slot_for(&plan, "gym").unwrap();
        assert_eq!((s.start.as_str(), s.end.as_str()), ("16:00", "17:00"));
    }

    #[test]
    fn latest_end_is_respected() {
        let t = Task::flexible("r", "Report", 90).with_window(None, Some("10:00"));
        let s = schedule_day("2026-01-05", &[t], "09:00", "17:00").unwrap();
        assert!(s.plan.slots.is_empty());
        assert_eq!(s.unplaced, vec!["r".to_string()]);
    }

    #[test]
    fn later_interval_is_tried_when_first_cannot_host() {
        // 09:00-10:00 is too early for the window, 11:00-17:00 works.
        let tasks = vec![
            Task::appointment("m", "Meeting", "10:00", "11:00"),
            Task::flexible("w", "Write", 60).with_window(Some("09:30"), Some("12:30")),
        ];
        let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();
        let s = slot_for(&plan, "w").unwrap();
        assert_eq!((s.start.as_str(), s.end.as_str()), ("11:00", "12:00"));
    }

    #[test]
    fn zero_duration_task_gets_zero_length_slot() {
        let tasks = vec![Task::flexible("z", "Pill", 0)];
        let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();
        let s = slot_for(&plan, "z").unwrap();
        assert_eq!(s.start, s.end);
    }

    #[test]
    fn oversized_task_is_never_placed() {
        let tasks = vec![Task::flexible("big", "Big", 9 * 60)];
        let s = schedule_day("2026-01-05", &tasks, "09:00", "17:00").unwrap();
        assert!(s.plan.slots.is_empty());
        assert_eq!(s.unplaced.len(), 1);
    }

    #[test]
    fn duplicate_ids_are_placed_once() {
        let tasks = vec![Task::flexible("a", "A", 30), Task::flexible("a", "A", 30)];
        let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();
        assert_eq!(plan.slots.len(), 1);
    }

    #[test]
    fn lateness_scores() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert_eq!(lateness(&Task::flexible("a", "A", 10), date), 1.0);

        let daily = Task::flexible("b", "B", 10).with_last_done("2026-01-07");
        assert_eq!(lateness(&daily, date), 3.0);

        let every4 = Task::flexible("c", "C", 10)
            .with_recurrence(Recurrence::EveryNDays { interval_days: 4 })
            .with_last_done("2026-01-08");
        assert_eq!(lateness(&every4, date), 0.5);

        let garbage = Task::flexible("d", "D", 10).with_last_done("yesterday");
        assert_eq!(lateness(&garbage, date), 0.0);
    }
}

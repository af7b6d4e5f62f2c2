//! Feedback bookkeeping and optimization suggestions.
//!
//! Feedback lives on plan slots. `apply_feedback` folds one rating into the
//! task's statistics; `analyze_task` looks at a rating history and proposes
//! catalog changes without applying them.

use serde::{Deserialize, Serialize};

use crate::plan::{FeedbackRating, Slot};
use crate::recurrence::Recurrence;
use crate::task::Task;
use crate::time::Minutes;

/// EMA weights for the running actual-duration average. Must sum to 1.
pub const EXISTING_WEIGHT: f64 = 0.8;
pub const NEW_WEIGHT: f64 = 0.2;
/// Duration scaling applied on a `too_much` rating.
pub const TOO_MUCH_FACTOR: f64 = 0.9;
pub const MIN_TASK_DURATION_MIN: Minutes = 10;

/// Fold a rating for `slot` (done on `date`) into `task`.
pub fn apply_feedback(task: &mut Task, slot: &Slot, rating: FeedbackRating, date: &str) {
    match rating {
        FeedbackRating::OnTrack => {
            if let Some(actual) = slot.duration().filter(|d| *d > 0) {
                let actual = f64::from(actual);
                task.avg_actual_duration_min = if task.avg_actual_duration_min <= 0.0 {
                    actual
                } else {
                    task.avg_actual_duration_min * EXISTING_WEIGHT + actual * NEW_WEIGHT
                };
            }
            task.success_streak += 1;
            task.last_done = Some(date.to_string());
        }
        FeedbackRating::TooMuch => {
            let reduced = (f64::from(task.duration_min) * TOO_MUCH_FACTOR) as Minutes;
            task.duration_min = reduced.max(MIN_TASK_DURATION_MIN);
            task.success_streak = 0;
            task.last_done = Some(date.to_string());
        }
        FeedbackRating::Unnecessary => {
            if let Recurrence::EveryNDays { interval_days } = &mut task.recurrence {
                *interval_days += 1;
            }
            task.success_streak = 0;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Suggestion {
    ReduceDuration { from_min: Minutes, to_min: Minutes },
    SplitTask { duration_min: Minutes },
    ReduceFrequency { from: Recurrence, to: Recurrence },
    RemoveTask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Optimization {
    pub task_id: String,
    pub task_name: String,
    pub suggestion: Suggestion,
    pub reason: String,
}

/// Suggest changes for one task from its recent ratings (most recent first,
/// already limited by the caller).
///
/// - more than half `too_much`: split short tasks, otherwise cut duration by 25%
/// - three or more, or over 40%, `unnecessary`: space out every-N-days and
///   daily tasks, suggest removing anything else
pub fn analyze_task(task: &Task, ratings: &[FeedbackRating]) -> Vec<Optimization> {
    if ratings.is_empty() {
        return Vec::new();
    }

    let total = ratings.len() as f64;
    let too_much = ratings.iter().filter(|r| **r == FeedbackRating::TooMuch).count();
    let unnecessary = ratings.iter().filter(|r| **r == FeedbackRating::Unnecessary).count();
    let too_much_pct = too_much as f64 / total * 100.0;
    let unnecessary_pct = unnecessary as f64 / total * 100.0;

    let mut out = Vec::new();
    let mut push = |suggestion: Suggestion, reason: String| {
        out.push(Optimization {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            suggestion,
            reason,
        });
    };

    if too_much_pct > 50.0 {
        let reduced = (f64::from(task.duration_min) * 0.75) as Minutes;
        if reduced <= MIN_TASK_DURATION_MIN || task.duration_min <= 30 {
            push(
                Suggestion::SplitTask {
                    duration_min: task.duration_min,
                },
                format!(
                    "{too_much_pct:.0}% of recent feedback indicates task is overwhelming (too_much)"
                ),
            );
        } else {
            push(
                Suggestion::ReduceDuration {
                    from_min: task.duration_min,
                    to_min: reduced,
                },
                format!(
                    "{too_much_pct:.0}% of recent feedback indicates task takes too long (too_much)"
                ),
            );
        }
    }

    if unnecessary >= 3 || unnecessary_pct > 40.0 {
        let reason =
            format!("{unnecessary_pct:.0}% of recent feedback indicates task is unnecessary");
        match &task.recurrence {
            Recurrence::EveryNDays { interval_days } => push(
                Suggestion::ReduceFrequency {
                    from: task.recurrence.clone(),
                    to: Recurrence::EveryNDays {
                        interval_days: interval_days + 2,
                    },
                },
                reason,
            ),
            Recurrence::Daily => push(
                Suggestion::ReduceFrequency {
                    from: Recurrence::Daily,
                    to: Recurrence::EveryNDays { interval_days: 2 },
                },
                reason,
            ),
            _ => push(Suggestion::RemoveTask, reason),
        }
    }

    out
}

/// Run [`analyze_task`] over every active, live task. `history` returns the
/// rating history for a task ID.
pub fn analyze_catalog<H>(tasks: &[Task], mut history: H) -> Vec<Optimization>
where
    H: FnMut(&str) -> Vec<FeedbackRating>,
{
    tasks
        .iter()
        .filter(|t| t.active && !t.is_deleted())
        .flat_map(|t| analyze_task(t, &history(&t.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use FeedbackRating::*;

    #[test]
    fn on_track_blends_average() {
        let mut t = Task::flexible("a", "Read", 30);
        let slot = Slot::planned("09:00", "09:40", "a");

        apply_feedback(&mut t, &slot, OnTrack, "2026-01-05");
        assert_eq!(t.avg_actual_duration_min, 40.0);
        assert_eq!(t.last_done(), Some("2026-01-05"));

        let slot = Slot::planned("09:00", "09:20", "a");
        apply_feedback(&mut t, &slot, OnTrack, "2026-01-06");
        assert!((t.avg_actual_duration_min - 36.0).abs() < 1e-9);
        assert_eq!(t.success_streak, 2);
    }

    #[test]
    fn too_much_shrinks_with_floor() {
        let mut t = Task::flexible("a", "Read", 60);
        let slot = Slot::planned("09:00", "10:00", "a");
        apply_feedback(&mut t, &slot, TooMuch, "2026-01-05");
        assert_eq!(t.duration_min, 54);

        let mut short = Task::flexible("b", "Floss", 10);
        apply_feedback(&mut short, &slot, TooMuch, "2026-01-05");
        assert_eq!(short.duration_min, MIN_TASK_DURATION_MIN);
    }

    #[test]
    fn unnecessary_spaces_out_interval_tasks() {
        let mut t = Task::flexible("a", "Water plants", 10)
            .with_recurrence(Recurrence::EveryNDays { interval_days: 3 });
        let slot = Slot::planned("09:00", "09:10", "a");
        apply_feedback(&mut t, &slot, Unnecessary, "2026-01-05");
        assert_eq!(t.recurrence, Recurrence::EveryNDays { interval_days: 4 });
        assert_eq!(t.last_done(), None);
    }

    #[test]
    fn no_history_no_suggestions() {
        assert!(analyze_task(&Task::flexible("a", "A", 60), &[]).is_empty());
    }

    #[test]
    fn long_overwhelming_task_gets_shorter() {
        let t = Task::flexible("a", "Deep work", 120);
        let out = analyze_task(&t, &[TooMuch, TooMuch, OnTrack]);
        assert_eq!(
            out[0].suggestion,
            Suggestion::ReduceDuration {
                from_min: 120,
                to_min: 90
            }
        );
    }

    #[test]
    fn short_overwhelming_task_gets_split() {
        let t = Task::flexible("a", "Inbox", 30);
        let out = analyze_task(&t, &[TooMuch]);
        assert_eq!(out[0].suggestion, Suggestion::SplitTask { duration_min: 30 });
    }

    #[test]
    fn unnecessary_by_recurrence() {
        let history = [
            Unnecessary, Unnecessary, Unnecessary, OnTrack, OnTrack, OnTrack, OnTrack, OnTrack,
        ];

        let daily = Task::flexible("d", "Daily", 20);
        assert_eq!(
            analyze_task(&daily, &history)[0].suggestion,
            Suggestion::ReduceFrequency {
                from: Recurrence::Daily,
                to: Recurrence::EveryNDays { interval_days: 2 }
            }
        );

        let weekly = Task::flexible("w", "Weekly", 20).with_recurrence(Recurrence::Weekdays);
        assert_eq!(analyze_task(&weekly, &history)[0].suggestion, Suggestion::RemoveTask);
    }

    #[test]
    fn catalog_skips_inactive() {
        let tasks = vec![
            Task::flexible("a", "A", 120),
            Task::flexible("b", "B", 120).inactive(),
        ];
        let out = analyze_catalog(&tasks, |_| vec![TooMuch]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].task_id, "a");
    }
}

use anyhow::{Context, Result};
use daylit_core::optimizer::{Suggestion, analyze_catalog, apply_feedback};
use daylit_core::time::format_date;
use daylit_core::{Feedback, FeedbackRating, Slot, SlotStatus};

use crate::App;
use crate::plan_cmd::names;
use crate::task_cmd::describe_recurrence;

pub fn now(app: &App) -> Result<()> {
    let date = format_date(app.config.day.today()?);
    let minute = app.config.day.now_minute()?;

    let Some(plan) = app.store.latest_plan(&date)? else {
        println!("No plan for today. Run: daylit plan --accept");
        return Ok(());
    };
    let tasks = app.store.load_tasks()?;
    let names = names(&tasks);

    match plan.current_slot(minute) {
        Some(slot) => {
            let name = names.get(slot.task_id.as_str()).copied().unwrap_or("Unknown");
            println!("Now: {name} ({}-{})", slot.start, slot.end);
        }
        None => println!("Nothing scheduled right now."),
    }
    Ok(())
}

pub fn feedback(app: &App, rating: FeedbackRating, note: Option<String>) -> Result<()> {
    let today = app.config.day.today()?;
    let date = format_date(today);
    let minute = app.config.day.now_minute()?;

    let mut plan = app
        .store
        .latest_plan(&date)?
        .with_context(|| format!("no plan for {date}"))?;
    let index = plan
        .feedback_target(minute)
        .context("no finished slot is waiting for feedback")?;

    let mut tasks = app.store.load_tasks()?;
    let slot = &mut plan.slots[index];
    record_rating(slot, rating, note);

    let task_name = match tasks.iter_mut().find(|t| t.id == slot.task_id) {
        Some(task) => {
            apply_feedback(task, slot, rating, &date);
            task.name.clone()
        }
        None => {
            tracing::warn!(task_id = %slot.task_id, "feedback for a task missing from the catalog");
            slot.task_id.clone()
        }
    };
    println!("Recorded {rating:?} for {task_name} ({}-{})", slot.start, slot.end);

    app.store.save_plan(plan)?;
    app.store.save_tasks(&tasks)
}

/// Any rating closes the slot, `unnecessary` included.
fn record_rating(slot: &mut Slot, rating: FeedbackRating, note: Option<String>) {
    slot.feedback = Some(Feedback { rating, note });
    slot.status = SlotStatus::Done;
}

pub fn optimize(app: &App, limit: usize) -> Result<()> {
    let tasks = app.store.load_tasks()?;
    let history = app.store.feedback_history(limit)?;
    let suggestions = analyze_catalog(&tasks, |id| history.get(id).cloned().unwrap_or_default());

    if suggestions.is_empty() {
        println!("No optimizations suggested.");
        return Ok(());
    }

    for s in &suggestions {
        let change = match &s.suggestion {
            Suggestion::ReduceDuration { from_min, to_min } => {
                format!("reduce duration {from_min}m -> {to_min}m")
            }
            Suggestion::SplitTask { duration_min } => {
                format!("split into smaller tasks ({duration_min}m now)")
            }
            Suggestion::ReduceFrequency { from, to } => format!(
                "reduce frequency: {} -> {}",
                describe_recurrence(from),
                describe_recurrence(to)
            ),
            Suggestion::RemoveTask => "remove task".to_string(),
        };
        println!("{}: {change}\n  {}", s.task_name, s.reason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daylit_core::DayPlan;

    #[test]
    fn every_rating_marks_the_slot_done() {
        for rating in [
            FeedbackRating::OnTrack,
            FeedbackRating::TooMuch,
            FeedbackRating::Unnecessary,
        ] {
            let mut plan = DayPlan::new("2026-01-05", vec![Slot::planned("09:00", "10:00", "a")]);
            plan.accept(chrono::Utc::now()).unwrap();
            let index = plan.feedback_target(10 * 60).unwrap();

            record_rating(&mut plan.slots[index], rating, Some("note".into()));

            let slot = &plan.slots[index];
            assert_eq!(slot.status, SlotStatus::Done, "{rating:?}");
            assert_eq!(slot.feedback.as_ref().unwrap().rating, rating);
            assert_eq!(plan.feedback_target(10 * 60), None);
        }
    }
}

use std::collections::HashMap;

use anyhow::{Result, bail};
use daylit_core::{
    DayPlan, RevisionState, Task, auto_fix_duplicate_tasks, schedule_day, validate_plan,
    validate_tasks,
};
use tracing::info;

use crate::App;

pub fn names(tasks: &[Task]) -> HashMap<&str, &str> {
    tasks.iter().map(|t| (t.id.as_str(), t.name.as_str())).collect()
}

pub fn print_plan(plan: &DayPlan, tasks: &[Task]) {
    let names = names(tasks);
    let state = match plan.state {
        RevisionState::Draft => "draft",
        RevisionState::Accepted { .. } => "accepted",
        RevisionState::Superseded { .. } => "superseded",
    };
    if plan.revision > 0 {
        println!("# Plan for {} (revision {}, {state})\n", plan.date, plan.revision);
    } else {
        println!("# Plan for {} (unsaved)\n", plan.date);
    }

    let mut shown = 0;
    for slot in plan.live_slots() {
        let name = names.get(slot.task_id.as_str()).copied().unwrap_or("Unknown");
        let rating = slot
            .feedback
            .as_ref()
            .map(|f| format!(" [{:?}]", f.rating))
            .unwrap_or_default();
        println!("{}-{}  {name}{rating}", slot.start, slot.end);
        shown += 1;
    }
    if shown == 0 {
        println!("(no slots)");
    }
}

pub fn plan(app: &App, date: &str, save: bool, accept: bool) -> Result<()> {
    let tasks = app.store.load_tasks()?;
    let day = &app.config.day;

    if let Some(existing) = app.store.latest_plan(date)? {
        if existing.is_accepted() && !save {
            println!(
                "Note: revision {} of {date} is already accepted; use --save to supersede it.\n",
                existing.revision
            );
        }
    }

    let schedule = schedule_day(date, &tasks, &day.day_start, &day.day_end)?;
    let names = names(&tasks);

    let mut plan = schedule.plan;
    if save || accept {
        plan = app.store.save_plan(plan)?;
        if accept {
            plan.accept(chrono::Utc::now())?;
            plan = app.store.save_plan(plan)?;
        }
        info!(date, revision = plan.revision, accepted = accept, "saved plan");
    }

    print_plan(&plan, &tasks);

    if !schedule.unplaced.is_empty() {
        println!("\nCould not fit:");
        for id in &schedule.unplaced {
            println!("- {}", names.get(id.as_str()).copied().unwrap_or(id.as_str()));
        }
    }

    let report = validate_plan(&plan, &tasks, &day.day_start, &day.day_end);
    if report.has_conflicts() {
        println!("\n{}", report.format_report().trim_end());
    }
    Ok(())
}

/// Show the stored plan for a date.
pub fn show_day(app: &App, date: &str) -> Result<()> {
    let Some(plan) = app.store.latest_plan(date)? else {
        println!("No plan saved for {date}. Run: daylit plan --date {date} --save");
        return Ok(());
    };
    let tasks = app.store.load_tasks()?;
    print_plan(&plan, &tasks);
    Ok(())
}

pub fn validate(app: &App, date: &str, fix: bool) -> Result<()> {
    let tasks = app.store.load_tasks()?;
    let day = &app.config.day;

    let plan_date = daylit_core::time::parse_date(date)?;
    let mut report = validate_tasks(&tasks, Some(plan_date));
    if let Some(plan) = app.store.latest_plan(date)? {
        report
            .conflicts
            .extend(validate_plan(&plan, &tasks, &day.day_start, &day.day_end).conflicts);
    }

    println!("{}", report.format_report().trim_end());

    if !fix {
        return Ok(());
    }

    let mut catalog = tasks.clone();
    let now = chrono::Utc::now();
    let actions = auto_fix_duplicate_tasks(&report.conflicts, &tasks, |id| {
        match catalog.iter_mut().find(|t| t.id == id) {
            Some(t) => t.lifecycle.delete(now).map_err(|e| e.to_string()),
            None => Err(format!("no task with ID {id}")),
        }
    });

    if actions.is_empty() {
        println!("\nNothing to fix automatically.");
        return Ok(());
    }

    app.store.save_tasks(&catalog)?;
    println!();
    for action in &actions {
        println!("{}", action.describe());
    }
    if actions.iter().any(|a| !a.is_complete()) {
        bail!("some duplicate tasks could not be removed");
    }
    Ok(())
}

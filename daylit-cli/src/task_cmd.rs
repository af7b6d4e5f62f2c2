use anyhow::{Context, Result, bail};
use chrono::Weekday;
use clap::{Args, ValueEnum};
use daylit_core::recurrence::LAST_OCCURRENCE;
use daylit_core::time::{is_valid_time, parse_minutes};
use daylit_core::{EnergyBand, Recurrence, Task, TaskKind};

use crate::App;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "snake_case")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    NDays,
    AdHoc,
    MonthlyDate,
    MonthlyDay,
    Yearly,
    Weekdays,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyArg {
    Low,
    Medium,
    High,
}

impl From<EnergyArg> for EnergyBand {
    fn from(e: EnergyArg) -> Self {
        match e {
            EnergyArg::Low => EnergyBand::Low,
            EnergyArg::Medium => EnergyBand::Medium,
            EnergyArg::High => EnergyBand::High,
        }
    }
}

#[derive(Args, Debug)]
pub struct RecurrenceArgs {
    /// Recurrence rule
    #[arg(long, value_enum, default_value_t = RecurrenceKind::AdHoc)]
    pub recurrence: RecurrenceKind,

    /// Days between occurrences (n_days)
    #[arg(long, default_value_t = 1)]
    pub interval: u32,

    /// Comma-separated weekdays (weekly), e.g. mon,wed,fri
    #[arg(long, value_delimiter = ',')]
    pub weekdays: Vec<String>,

    /// Day of month (monthly_date, yearly)
    #[arg(long)]
    pub month_day: Option<u32>,

    /// Month number 1-12 (yearly)
    #[arg(long)]
    pub month: Option<u32>,

    /// Weekday (monthly_day), e.g. fri
    #[arg(long)]
    pub weekday: Option<String>,

    /// Occurrence 1-5, or -1 for the last one (monthly_day)
    #[arg(long, allow_hyphen_values = true)]
    pub occurrence: Option<i8>,
}

impl RecurrenceArgs {
    pub fn to_recurrence(&self) -> Result<Recurrence> {
        Ok(match self.recurrence {
            RecurrenceKind::Daily => Recurrence::Daily,
            RecurrenceKind::AdHoc => Recurrence::AdHoc,
            RecurrenceKind::Weekdays => Recurrence::Weekdays,
            RecurrenceKind::NDays => {
                if self.interval == 0 {
                    bail!("--interval must be at least 1");
                }
                Recurrence::EveryNDays {
                    interval_days: self.interval,
                }
            }
            RecurrenceKind::Weekly => {
                if self.weekdays.is_empty() {
                    bail!("weekly recurrence needs --weekdays (e.g. mon,thu)");
                }
                let weekdays = self
                    .weekdays
                    .iter()
                    .map(|w| parse_weekday(w))
                    .collect::<Result<Vec<_>>>()?;
                Recurrence::Weekly { weekdays }
            }
            RecurrenceKind::MonthlyDate => {
                let month_day = self
                    .month_day
                    .context("monthly_date recurrence needs --month-day")?;
                if !(1..=31).contains(&month_day) {
                    bail!("--month-day must be 1-31, got {month_day}");
                }
                Recurrence::MonthlyDate { month_day }
            }
            RecurrenceKind::MonthlyDay => {
                let weekday = self
                    .weekday
                    .as_deref()
                    .context("monthly_day recurrence needs --weekday")?;
                let occurrence = self
                    .occurrence
                    .context("monthly_day recurrence needs --occurrence")?;
                if occurrence != LAST_OCCURRENCE && !(1..=5).contains(&occurrence) {
                    bail!("--occurrence must be 1-5 or -1, got {occurrence}");
                }
                Recurrence::MonthlyDay {
                    weekday: parse_weekday(weekday)?,
                    occurrence,
                }
            }
            RecurrenceKind::Yearly => {
                let month = self.month.context("yearly recurrence needs --month")?;
                let day = self.month_day.context("yearly recurrence needs --month-day")?;
                if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                    bail!("invalid yearly date: month {month}, day {day}");
                }
                Recurrence::Yearly { month, day }
            }
        })
    }
}

fn parse_weekday(s: &str) -> Result<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("invalid weekday: {s}"))
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task name
    pub name: String,

    /// Duration in minutes (defaults to the configured block; derived for appointments)
    #[arg(long)]
    pub duration: Option<i32>,

    #[command(flatten)]
    pub recurrence: RecurrenceArgs,

    /// Earliest start time (HH:MM)
    #[arg(long)]
    pub earliest: Option<String>,

    /// Latest end time (HH:MM)
    #[arg(long)]
    pub latest: Option<String>,

    /// Fixed start time for appointments (HH:MM)
    #[arg(long, requires = "fixed_end")]
    pub fixed_start: Option<String>,

    /// Fixed end time for appointments (HH:MM)
    #[arg(long, requires = "fixed_start")]
    pub fixed_end: Option<String>,

    /// Priority 1-5, lower is scheduled first
    #[arg(long, default_value_t = daylit_core::DEFAULT_PRIORITY)]
    pub priority: u8,

    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
}

/// Build a catalog entry from `task add` arguments.
pub fn build_task(id: String, args: &AddArgs, default_block_min: i32) -> Result<Task> {
    if args.name.trim().is_empty() {
        bail!("task name must not be empty");
    }
    if !(1..=5).contains(&args.priority) {
        bail!("--priority must be 1-5, got {}", args.priority);
    }
    for (flag, value) in [
        ("--earliest", &args.earliest),
        ("--latest", &args.latest),
        ("--fixed-start", &args.fixed_start),
        ("--fixed-end", &args.fixed_end),
    ] {
        if let Some(v) = value {
            if !is_valid_time(v) {
                bail!("{flag} must be HH:MM, got {v:?}");
            }
        }
    }

    let recurrence = args.recurrence.to_recurrence()?;
    let mut task = match (&args.fixed_start, &args.fixed_end) {
        (Some(start), Some(end)) => {
            let (s, e) = (parse_minutes("fixed_start", start)?, parse_minutes("fixed_end", end)?);
            if e <= s {
                bail!("--fixed-end ({end}) must be after --fixed-start ({start})");
            }
            Task::appointment(id, args.name.trim(), start.as_str(), end.as_str())
        }
        _ => {
            let duration = args.duration.unwrap_or(default_block_min);
            if duration <= 0 {
                bail!("--duration must be positive, got {duration}");
            }
            Task::flexible(id, args.name.trim(), duration)
        }
    };

    task = task
        .with_recurrence(recurrence)
        .with_priority(args.priority)
        .with_window(args.earliest.as_deref(), args.latest.as_deref());
    if let Some(energy) = args.energy {
        task = task.with_energy(energy.into());
    }
    Ok(task)
}

pub fn add(app: &App, args: &AddArgs) -> Result<()> {
    let mut tasks = app.store.load_tasks()?;
    let id = uuid::Uuid::new_v4().to_string();
    let task = build_task(id, args, app.config.day.default_block_min)?;

    if tasks.iter().any(|t| !t.is_deleted() && t.name == task.name) {
        tracing::warn!(name = %task.name, "a live task with this name already exists");
    }

    println!("Added task: {} ({})", task.name, task.id);
    tasks.push(task);
    app.store.save_tasks(&tasks)
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// Task ID
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    /// Duration in minutes (flexible tasks)
    #[arg(long)]
    pub duration: Option<i32>,

    /// Replace the recurrence rule; takes the same detail flags as `task add`
    #[arg(long, value_enum)]
    pub recurrence: Option<RecurrenceKind>,

    /// Days between occurrences (n_days)
    #[arg(long)]
    pub interval: Option<u32>,

    /// Comma-separated weekdays (weekly)
    #[arg(long, value_delimiter = ',')]
    pub weekdays: Option<Vec<String>>,

    #[arg(long)]
    pub month_day: Option<u32>,

    #[arg(long)]
    pub month: Option<u32>,

    #[arg(long)]
    pub weekday: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub occurrence: Option<i8>,

    /// Earliest start time (HH:MM, empty to clear)
    #[arg(long)]
    pub earliest: Option<String>,

    /// Latest end time (HH:MM, empty to clear)
    #[arg(long)]
    pub latest: Option<String>,

    /// Fixed start time (HH:MM, empty to clear)
    #[arg(long)]
    pub fixed_start: Option<String>,

    /// Fixed end time (HH:MM, empty to clear)
    #[arg(long)]
    pub fixed_end: Option<String>,

    #[arg(long)]
    pub priority: Option<u8>,

    #[arg(long)]
    pub active: Option<bool>,

    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
}

impl EditArgs {
    /// New recurrence, if any recurrence flag was given.
    ///
    /// `--recurrence` rebuilds the rule. Without it, `--interval` and
    /// `--weekdays` adjust the current rule when it is of the matching kind.
    fn recurrence_change(&self, current: &Recurrence) -> Result<Option<Recurrence>> {
        if let Some(kind) = self.recurrence {
            let args = RecurrenceArgs {
                recurrence: kind,
                interval: self.interval.unwrap_or(1),
                weekdays: self.weekdays.clone().unwrap_or_default(),
                month_day: self.month_day,
                month: self.month,
                weekday: self.weekday.clone(),
                occurrence: self.occurrence,
            };
            return args.to_recurrence().map(Some);
        }

        let mut next = current.clone();
        let mut changed = false;
        if let Some(interval) = self.interval {
            let Recurrence::EveryNDays { interval_days } = &mut next else {
                bail!("--interval only applies to n_days tasks (pass --recurrence n_days)");
            };
            if interval == 0 {
                bail!("--interval must be at least 1");
            }
            *interval_days = interval;
            changed = true;
        }
        if let Some(days) = &self.weekdays {
            let Recurrence::Weekly { weekdays } = &mut next else {
                bail!("--weekdays only applies to weekly tasks (pass --recurrence weekly)");
            };
            if days.is_empty() {
                bail!("weekly recurrence needs at least one weekday");
            }
            *weekdays = days.iter().map(|w| parse_weekday(w)).collect::<Result<Vec<_>>>()?;
            changed = true;
        }
        Ok(changed.then_some(next))
    }
}

/// `Some("")` clears a time field; anything else must be `HH:MM`.
fn time_edit(flag: &str, value: &Option<String>) -> Result<Option<Option<String>>> {
    match value.as_deref() {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(v) if is_valid_time(v) => Ok(Some(Some(v.to_string()))),
        Some(v) => bail!("{flag} must be HH:MM, got {v:?}"),
    }
}

/// Apply `task edit` arguments. Nothing is changed when any argument is invalid.
pub fn apply_edit(task: &mut Task, args: &EditArgs) -> Result<()> {
    let mut next = task.clone();

    if let Some(name) = &args.name {
        if name.trim().is_empty() {
            bail!("task name must not be empty");
        }
        next.name = name.trim().to_string();
    }
    if let Some(duration) = args.duration {
        if duration <= 0 {
            bail!("--duration must be positive, got {duration}");
        }
        next.duration_min = duration;
    }
    if let Some(priority) = args.priority {
        if !(1..=5).contains(&priority) {
            bail!("--priority must be 1-5, got {priority}");
        }
        next.priority = priority;
    }
    if let Some(active) = args.active {
        next.active = active;
    }
    if let Some(energy) = args.energy {
        next.energy_band = Some(energy.into());
    }
    if let Some(recurrence) = args.recurrence_change(&task.recurrence)? {
        next.recurrence = recurrence;
    }

    if let Some(v) = time_edit("--earliest", &args.earliest)? {
        next.earliest_start = v;
    }
    if let Some(v) = time_edit("--latest", &args.latest)? {
        next.latest_end = v;
    }
    if let Some(v) = time_edit("--fixed-start", &args.fixed_start)? {
        next.fixed_start = v;
    }
    if let Some(v) = time_edit("--fixed-end", &args.fixed_end)? {
        next.fixed_end = v;
    }

    // both fixed times make an appointment, anything else is flexible
    let fixed_duration = match next.fixed_window() {
        Some((start, end)) => {
            let (s, e) = (parse_minutes("fixed_start", start)?, parse_minutes("fixed_end", end)?);
            if e <= s {
                bail!("fixed end ({end}) must be after fixed start ({start})");
            }
            Some(e - s)
        }
        None => None,
    };
    match fixed_duration {
        Some(duration) => {
            next.kind = TaskKind::Appointment;
            next.duration_min = duration;
        }
        None => next.kind = TaskKind::Flexible,
    }

    *task = next;
    Ok(())
}

pub fn edit(app: &App, args: &EditArgs) -> Result<()> {
    let mut tasks = app.store.load_tasks()?;
    let task = tasks
        .iter_mut()
        .find(|t| t.id == args.id && !t.is_deleted())
        .with_context(|| format!("no live task with ID {}", args.id))?;
    apply_edit(task, args).with_context(|| format!("task {}", args.id))?;
    println!("Task updated: {}", task.name);
    app.store.save_tasks(&tasks)
}

pub fn list(app: &App, active_only: bool, include_deleted: bool) -> Result<()> {
    let tasks = app.store.load_tasks()?;
    let shown: Vec<&Task> = tasks
        .iter()
        .filter(|t| include_deleted || !t.is_deleted())
        .filter(|t| !active_only || t.active)
        .collect();

    if shown.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    for t in shown {
        let timing = match (t.kind, t.fixed_window()) {
            (TaskKind::Appointment, Some((s, e))) => format!("{s}-{e}"),
            _ => format!("{}m", t.duration_min),
        };
        let mut flags = Vec::new();
        if !t.active {
            flags.push("inactive");
        }
        if t.is_deleted() {
            flags.push("deleted");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "{} | {} | {} | p{} | {}{}",
            t.id,
            t.name,
            timing,
            t.priority,
            describe_recurrence(&t.recurrence),
            flags
        );
    }
    Ok(())
}

pub fn delete(app: &App, id: &str) -> Result<()> {
    update_lifecycle(app, id, |t| t.lifecycle.delete(chrono::Utc::now()))?;
    println!("Deleted task {id}");
    Ok(())
}

pub fn restore(app: &App, id: &str) -> Result<()> {
    update_lifecycle(app, id, |t| t.lifecycle.restore(chrono::Utc::now()))?;
    println!("Restored task {id}");
    Ok(())
}

fn update_lifecycle<F>(app: &App, id: &str, change: F) -> Result<()>
where
    F: FnOnce(&mut Task) -> daylit_core::Result<()>,
{
    let mut tasks = app.store.load_tasks()?;
    let task = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .with_context(|| format!("no task with ID {id}"))?;
    change(task).with_context(|| format!("task {id}"))?;
    app.store.save_tasks(&tasks)
}

pub fn describe_recurrence(r: &Recurrence) -> String {
    match r {
        Recurrence::Daily => "daily".to_string(),
        Recurrence::Weekdays => "weekdays".to_string(),
        Recurrence::AdHoc => "ad hoc".to_string(),
        Recurrence::Weekly { weekdays } => {
            let days: Vec<String> = weekdays.iter().map(|d| d.to_string()).collect();
            format!("weekly on {}", days.join(","))
        }
        Recurrence::EveryNDays { interval_days } => format!("every {interval_days} days"),
        Recurrence::MonthlyDate { month_day } => format!("monthly on day {month_day}"),
        Recurrence::MonthlyDay {
            weekday,
            occurrence,
        } if *occurrence == LAST_OCCURRENCE => format!("monthly on the last {weekday}"),
        Recurrence::MonthlyDay {
            weekday,
            occurrence,
        } => format!("monthly on {weekday} #{occurrence}"),
        Recurrence::Yearly { month, day } => format!("yearly on {month:02}-{day:02}"),
    }
}

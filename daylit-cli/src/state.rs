use anyhow::{Context, Result};
use daylit_core::{DayPlan, FeedbackRating, RevisionState, Task};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `$DAYLIT_HOME`, else `~/.daylit`.
pub fn daylit_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("DAYLIT_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".daylit"))
}

pub fn ensure_daylit_home() -> Result<PathBuf> {
    let dir = daylit_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// File-backed catalog and plan history.
///
/// Layout under the root:
/// - `tasks.json`: the whole catalog, soft-deleted tasks included
/// - `plans/<date>.json`: every revision of that date's plan, oldest first
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open_default() -> Result<Self> {
        Self::open(ensure_daylit_home()?)
    }

    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let plans = root.join("plans");
        fs::create_dir_all(&plans).with_context(|| format!("create {}", plans.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tasks_path(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    fn plans_dir(&self) -> PathBuf {
        self.root.join("plans")
    }

    fn plan_path(&self, date: &str) -> PathBuf {
        self.plans_dir().join(format!("{date}.json"))
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        read_json_or_default(&self.tasks_path())
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        write_json(&self.tasks_path(), tasks)
    }

    /// All stored revisions for `date`, oldest first.
    pub fn load_revisions(&self, date: &str) -> Result<Vec<DayPlan>> {
        let mut revisions: Vec<DayPlan> = read_json_or_default(&self.plan_path(date))?;
        revisions.sort_by_key(|p| p.revision);
        Ok(revisions)
    }

    pub fn save_revisions(&self, date: &str, revisions: &[DayPlan]) -> Result<()> {
        write_json(&self.plan_path(date), revisions)
    }

    /// Newest live revision for `date`.
    pub fn latest_plan(&self, date: &str) -> Result<Option<DayPlan>> {
        Ok(self
            .load_revisions(date)?
            .into_iter()
            .rev()
            .find(|p| !p.lifecycle.is_deleted()))
    }

    /// Store `plan` as a revision of its date.
    ///
    /// An unnumbered plan becomes a new draft: it replaces the newest draft,
    /// supersedes the newest accepted revision, or starts at revision 1. A
    /// numbered plan overwrites the revision with the same number.
    pub fn save_plan(&self, plan: DayPlan) -> Result<DayPlan> {
        let date = plan.date.clone();
        let mut revisions = self.load_revisions(&date)?;
        let now = chrono::Utc::now();

        let stored = if plan.revision > 0 {
            match revisions.iter_mut().find(|p| p.revision == plan.revision) {
                Some(existing) => *existing = plan.clone(),
                None => revisions.push(plan.clone()),
            }
            plan
        } else {
            let open = revisions.iter().rposition(|p| {
                !p.lifecycle.is_deleted() && !matches!(p.state, RevisionState::Superseded { .. })
            });
            match open {
                Some(i) => match revisions[i].revise(plan.slots, now)? {
                    Some(next) => {
                        revisions.push(next.clone());
                        next
                    }
                    None => {
                        let revision = revisions[i].revision;
                        debug!(date = %date, revision, "replaced draft slots");
                        revisions[i].clone()
                    }
                },
                None => {
                    let next = revisions.iter().map(|p| p.revision).max().unwrap_or(0) + 1;
                    let fresh = plan.with_revision(next);
                    revisions.push(fresh.clone());
                    fresh
                }
            }
        };

        self.save_revisions(&date, &revisions)?;
        Ok(stored)
    }

    /// Dates with stored plans, newest first.
    pub fn plan_dates(&self) -> Result<Vec<String>> {
        let dir = self.plans_dir();
        let mut dates = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                dates.push(stem.to_string());
            }
        }
        dates.sort_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Ratings per task ID from the newest revision of each stored date, most
    /// recent first, at most `limit` per task.
    pub fn feedback_history(&self, limit: usize) -> Result<HashMap<String, Vec<FeedbackRating>>> {
        let mut history: HashMap<String, Vec<FeedbackRating>> = HashMap::new();
        for date in self.plan_dates()? {
            let Some(plan) = self.latest_plan(&date)? else {
                continue;
            };
            for slot in plan.slots.iter().rev().filter(|s| !s.is_deleted()) {
                let Some(feedback) = &slot.feedback else {
                    continue;
                };
                let ratings = history.entry(slot.task_id.clone()).or_default();
                if ratings.len() < limit {
                    ratings.push(feedback.rating);
                }
            }
        }
        Ok(history)
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

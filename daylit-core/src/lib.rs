//! daylit-core: recurrence, time-block allocation and conflict checks for a daily planner

pub mod autofix;
pub mod error;
pub mod interval;
pub mod lifecycle;
pub mod optimizer;
pub mod plan;
pub mod recurrence;
pub mod scheduler;
pub mod settings;
pub mod task;
pub mod time;
pub mod validation;

pub use autofix::{FailedDelete, FixAction, auto_fix_duplicate_tasks};
pub use error::{PlanError, Result};
pub use interval::{FreeIntervals, Interval};
pub use lifecycle::Lifecycle;
pub use optimizer::{Optimization, Suggestion, analyze_catalog, analyze_task, apply_feedback};
pub use plan::{DayPlan, Feedback, FeedbackRating, RevisionState, Slot, SlotStatus};
pub use recurrence::{Recurrence, is_due};
pub use scheduler::{Schedule, generate_plan, lateness, schedule_day};
pub use settings::Settings;
pub use task::{DEFAULT_PRIORITY, EnergyBand, Task, TaskKind};
pub use time::Minutes;
pub use validation::{
    Conflict, ConflictKind, ValidationResult, times_overlap, validate_plan, validate_tasks,
};

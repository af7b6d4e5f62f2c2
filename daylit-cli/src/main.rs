use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daylit_core::FeedbackRating;
use daylit_core::time::{format_date, parse_date};

mod config;
mod feedback_cmd;
mod logging;
mod plan_cmd;
mod state;
mod task_cmd;

use config::Config;
use state::Store;

#[derive(Parser, Debug)]
#[command(
    name = "daylit",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DAYLIT_BUILD_SHA"), ")"),
    about = "Daily planner: recurring tasks, time blocks and conflict checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create ~/.daylit (or $DAYLIT_HOME) with a default config and empty catalog
    Init,

    /// Manage the task catalog
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Generate a plan for a day
    Plan {
        /// Date to plan (YYYY-MM-DD or "today")
        #[arg(long, default_value = "today")]
        date: String,

        /// Store the plan as a new draft revision
        #[arg(long)]
        save: bool,

        /// Store and accept the plan
        #[arg(long)]
        accept: bool,
    },

    /// Show the stored plan for a day
    Day {
        #[arg(default_value = "today")]
        date: String,
    },

    /// Check the catalog and the stored plan for conflicts
    Validate {
        #[arg(long, default_value = "today")]
        date: String,

        /// Remove duplicate-name tasks, keeping the lowest ID
        #[arg(long)]
        fix: bool,
    },

    /// Show the slot in progress
    Now,

    /// Rate the most recently finished slot
    Feedback {
        /// on_track, too_much or unnecessary
        #[arg(long)]
        rating: FeedbackRating,

        #[arg(long)]
        note: Option<String>,
    },

    /// Suggest catalog changes from recent feedback
    Optimize {
        /// Ratings considered per task
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Add a task
    Add(task_cmd::AddArgs),

    /// Change fields of a task
    Edit(task_cmd::EditArgs),

    /// List tasks
    List {
        #[arg(long)]
        active_only: bool,

        /// Include soft-deleted tasks
        #[arg(long)]
        all: bool,
    },

    /// Soft-delete a task
    Delete { id: String },

    /// Restore a soft-deleted task
    Restore { id: String },
}

/// Loaded state shared by every command.
pub struct App {
    pub store: Store,
    pub config: Config,
}

impl App {
    fn load() -> Result<Self> {
        let store = Store::open_default()?;
        let config = config::load_config(store.root())?;
        Ok(Self { store, config })
    }

    /// `today` in the configured timezone, or a strict `YYYY-MM-DD`.
    fn resolve_date(&self, date: &str) -> Result<String> {
        if date == "today" {
            return Ok(format_date(self.config.day.today()?));
        }
        parse_date(date).with_context(|| format!("bad date {date:?} (use YYYY-MM-DD or today)"))?;
        Ok(date.to_string())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let app = App::load()?;
    logging::init(&app.config.log.level);

    match cli.command {
        Command::Init => init(&app)?,

        Command::Task { command } => match command {
            TaskCommand::Add(args) => task_cmd::add(&app, &args)?,
            TaskCommand::Edit(args) => task_cmd::edit(&app, &args)?,
            TaskCommand::List { active_only, all } => task_cmd::list(&app, active_only, all)?,
            TaskCommand::Delete { id } => task_cmd::delete(&app, &id)?,
            TaskCommand::Restore { id } => task_cmd::restore(&app, &id)?,
        },

        Command::Plan { date, save, accept } => {
            let date = app.resolve_date(&date)?;
            plan_cmd::plan(&app, &date, save, accept)?;
        }

        Command::Day { date } => {
            let date = app.resolve_date(&date)?;
            plan_cmd::show_day(&app, &date)?;
        }

        Command::Validate { date, fix } => {
            let date = app.resolve_date(&date)?;
            plan_cmd::validate(&app, &date, fix)?;
        }

        Command::Now => feedback_cmd::now(&app)?,

        Command::Feedback { rating, note } => feedback_cmd::feedback(&app, rating, note)?,

        Command::Optimize { limit } => feedback_cmd::optimize(&app, limit)?,
    }

    Ok(())
}

fn init(app: &App) -> Result<()> {
    let store = &app.store;
    let home = store.root();

    if config::init_config(home)? {
        println!("Wrote {}", config::config_path(home).display());
    } else {
        println!("Config already exists: {}", config::config_path(home).display());
    }

    if store.load_tasks()?.is_empty() {
        store.save_tasks(&[])?;
    }
    println!("Storage ready at {}", home.display());
    Ok(())
}

//! CLI binary for taskminder.

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskminder::{
    ChannelNotifier, ReminderScheduler, SqliteTaskStore, TaskEdit, TaskId, TaskPriority,
    TaskRecord, TaskService, TaskminderConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Taskminder: prioritised tasks with reminders.
#[derive(Parser)]
#[command(name = "taskminder", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Add a task.
    Add {
        /// Task title.
        title: String,

        /// Longer description.
        #[arg(short, long, default_value = "")]
        description: String,

        /// Due time: RFC 3339 or an offset such as `+2h`.
        #[arg(long)]
        due: String,

        /// Reminder time: RFC 3339 or an offset such as `+90m`.
        #[arg(long)]
        remind: String,

        /// HIGH, MEDIUM or LOW.
        #[arg(short, long, default_value = "MEDIUM")]
        priority: TaskPriority,
    },

    /// List every stored task, open tasks in priority order first.
    List,

    /// Change fields of an existing task. Omitted options are left as is.
    Edit {
        id: TaskId,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        /// New description.
        #[arg(short, long)]
        description: Option<String>,

        /// New due time: RFC 3339 or an offset such as `+2h`.
        #[arg(long)]
        due: Option<String>,

        /// New reminder time: RFC 3339 or an offset such as `+90m`.
        #[arg(long)]
        remind: Option<String>,

        /// HIGH, MEDIUM or LOW.
        #[arg(short, long)]
        priority: Option<TaskPriority>,
    },

    /// Mark a task as in progress.
    Start { id: TaskId },

    /// Mark a task as completed.
    Complete { id: TaskId },

    /// Delete a task.
    Delete { id: TaskId },

    /// Run the scheduler and print reminders until Ctrl+C.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => TaskminderConfig::from_file(path)?,
        None => TaskminderConfig::load_or_default(&TaskminderConfig::default_config_path())?,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let db_path = config.store.resolved_db_path();
    let store = SqliteTaskStore::open(&db_path)
        .with_context(|| format!("opening task store at {}", db_path.display()))?;
    let (notifier, mut reminders) = ChannelNotifier::channel();
    let scheduler = ReminderScheduler::new(notifier, config.scheduler.clone())?;
    let service = TaskService::new(store, scheduler);

    match cli.command {
        Command::Add {
            title,
            description,
            due,
            remind,
            priority,
        } => {
            let now = Utc::now();
            let task = TaskRecord::builder()
                .title(title)
                .description(description)
                .due_time(parse_when(&due, now)?)
                .reminder_time(parse_when(&remind, now)?)
                .priority(priority)
                .build()?;
            let (task, arming) = service.add_task(task)?;
            println!("{}", task.id());
            if !arming.is_armed() {
                println!("note: reminder time is not in the future, no reminder will fire");
            }
        }
        Command::List => {
            service.load()?;
            let pending = service.scheduler().pending_tasks();
            for task in &pending {
                println!("{task}");
            }
            for task in service.all_tasks()? {
                if service.scheduler().find(task.id()).is_none() {
                    println!("{task}");
                }
            }
        }
        Command::Edit {
            id,
            title,
            description,
            due,
            remind,
            priority,
        } => {
            let now = Utc::now();
            let edit = TaskEdit {
                title,
                description,
                due_time: due.map(|due| parse_when(&due, now)).transpose()?,
                reminder_time: remind.map(|remind| parse_when(&remind, now)).transpose()?,
                priority,
            };
            if edit.is_empty() {
                anyhow::bail!("nothing to change, pass at least one field option");
            }
            let task = service.edit_task(id, edit)?;
            println!("{task}");
        }
        Command::Start { id } => {
            let task = service.start_task(id)?;
            println!("{task}");
        }
        Command::Complete { id } => {
            let task = service.complete_task(id)?;
            println!("{task}");
        }
        Command::Delete { id } => {
            service.delete_task(id)?;
            println!("deleted {id}");
        }
        Command::Watch => {
            let queued = service.load()?;
            info!(queued, db = %db_path.display(), "watching for reminders");
            loop {
                tokio::select! {
                    Some(task) = reminders.recv() => {
                        println!("REMINDER {task}");
                    }
                    result = tokio::signal::ctrl_c() => {
                        result.context("listening for Ctrl+C")?;
                        break;
                    }
                }
            }
            let report = service.shutdown().await;
            service.sync_pending()?;
            info!(
                cancelled = report.cancelled_reminders,
                forced = report.forced,
                "stopped"
            );
        }
    }

    Ok(())
}

/// Parse an RFC 3339 timestamp or a `+<n><s|m|h|d>` offset from `now`.
fn parse_when(input: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if let Some(offset) = input.strip_prefix('+') {
        let Some(unit) = offset.chars().last() else {
            anyhow::bail!("empty offset {input:?}");
        };
        let amount = &offset[..offset.len() - unit.len_utf8()];
        let amount: i64 = amount
            .parse()
            .with_context(|| format!("invalid offset {input:?}"))?;
        let delta = match unit {
            's' => TimeDelta::try_seconds(amount),
            'm' => TimeDelta::try_minutes(amount),
            'h' => TimeDelta::try_hours(amount),
            'd' => TimeDelta::try_days(amount),
            _ => anyhow::bail!("invalid offset unit in {input:?}, expected s, m, h or d"),
        }
        .with_context(|| format!("offset {input:?} out of range"))?;
        return now
            .checked_add_signed(delta)
            .with_context(|| format!("offset {input:?} is past the supported date range"));
    }
    Ok(DateTime::parse_from_rfc3339(input)
        .with_context(|| format!("invalid time {input:?}, expected RFC 3339 or +<n><unit>"))?
        .with_timezone(&Utc))
}

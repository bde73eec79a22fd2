//! jobwatch CLI - SLA tracking over a local JSON state file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobwatch_core::domain::{
    CompletionAnchor, JobId, JobRecord, Milestone, NewJob, NewReminder, NotificationId, Priority,
    ReminderId, SlaPolicy,
};
use jobwatch_core::engine::legacy_stage_label;
use jobwatch_core::impls::{InMemoryStore, StoreSnapshot};
use jobwatch_core::{Engine, EngineBuilder, EngineConfig};

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "SLA and reminder tracking for field-service jobs", long_about = None)]
struct Cli {
    /// State file
    #[arg(long, global = true, default_value = "jobwatch.json")]
    state: PathBuf,

    /// Engine config (JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty state file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Job operations
    #[command(subcommand)]
    Job(JobCommand),
    /// Reminder operations
    #[command(subcommand)]
    Reminder(ReminderCommand),
    /// Evaluate every job and reminder once
    Tick {
        /// Evaluate at this time instead of now (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// List notifications
    Notifications {
        #[arg(long)]
        unread: bool,
        #[command(subcommand)]
        command: Option<NotificationCommand>,
    },
    /// Show a job's timeline
    Timeline { job: JobId },
    /// Show overview counts
    Status,
    /// Run the ticker until Ctrl-C, then save state
    Watch,
}

#[derive(Subcommand)]
enum JobCommand {
    /// Log a new job
    Add {
        reference: String,
        #[arg(long, default_value = "normal")]
        priority: Priority,
        #[arg(long)]
        customer: Option<String>,
        /// Logged time (RFC 3339); now when omitted
        #[arg(long)]
        logged_at: Option<DateTime<Utc>>,
    },
    /// Record a milestone (accepted, on_site, completed)
    Mark {
        job: JobId,
        milestone: Milestone,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Re-time an already recorded milestone
    Correct {
        job: JobId,
        milestone: Milestone,
        at: DateTime<Utc>,
    },
    /// Replace a job's SLA policy (minutes)
    Policy {
        job: JobId,
        #[arg(long)]
        accept: i64,
        #[arg(long)]
        on_site: i64,
        #[arg(long)]
        complete: i64,
        /// Measure completion from logging instead of arrival on site
        #[arg(long)]
        from_logged: bool,
    },
    /// List jobs
    List,
}

#[derive(Subcommand)]
enum ReminderCommand {
    /// Add a reminder
    Add {
        title: String,
        /// Due time (RFC 3339)
        #[arg(long, conflicts_with = "in_minutes")]
        due: Option<DateTime<Utc>>,
        /// Due this many minutes from now
        #[arg(long)]
        in_minutes: Option<i64>,
        #[arg(long)]
        job: Option<JobId>,
    },
    /// Snooze a reminder
    Snooze {
        id: ReminderId,
        /// Minutes to snooze
        #[arg(long, default_value = "30")]
        minutes: i64,
    },
    /// Complete a reminder
    Complete { id: ReminderId },
    /// List reminders
    List,
}

#[derive(Subcommand)]
enum NotificationCommand {
    /// Mark a notification read
    Read { id: NotificationId },
}

fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {} (run `jobwatch init` first?)", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn minutes_after(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>> {
    match Duration::try_minutes(minutes).and_then(|offset| now.checked_add_signed(offset)) {
        Some(at) => Ok(at),
        None => bail!("{minutes} minutes from now is out of range"),
    }
}

fn print_job(engine: &Engine, job: &JobRecord) {
    println!(
        "  {} | {:<10} | {:<6} | {:<9} | {:<5} | {}",
        job.id,
        job.reference,
        job.priority,
        legacy_stage_label(job.stage()),
        engine.traffic_light(job),
        job.status.reason().unwrap_or_default(),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        if cli.state.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", cli.state.display());
        }
        save_snapshot(&cli.state, &StoreSnapshot::default())?;
        println!("Initialised {}", cli.state.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let store = Arc::new(InMemoryStore::from_snapshot(load_snapshot(&cli.state)?));
    let mut engine = EngineBuilder::new()
        .store(store.clone())
        .config(config)
        .build()?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Job(JobCommand::Add {
            reference,
            priority,
            customer,
            logged_at,
        }) => {
            let mut new = NewJob::new(reference).with_priority(priority);
            new.customer = customer;
            new.logged_at = logged_at;
            let job = engine.create_job(new).await?;
            println!("Added job {} ({})", job.id, job.reference);
        }
        Commands::Job(JobCommand::Mark { job, milestone, at }) => {
            let job = engine.record_milestone(job, milestone, at).await?;
            println!("{} {} -> {}", job.reference, milestone, job.status);
        }
        Commands::Job(JobCommand::Correct { job, milestone, at }) => {
            let job = engine.correct_milestone(job, milestone, at).await?;
            println!("{} {} corrected -> {}", job.reference, milestone, job.status);
        }
        Commands::Job(JobCommand::Policy {
            job,
            accept,
            on_site,
            complete,
            from_logged,
        }) => {
            let anchor = if from_logged {
                CompletionAnchor::Logged
            } else {
                CompletionAnchor::OnSite
            };
            let policy = SlaPolicy::new(accept, on_site, complete, anchor)?;
            let job = engine.update_policy(job, policy).await?;
            println!("{} policy updated -> {}", job.reference, job.status);
        }
        Commands::Job(JobCommand::List) => {
            let jobs = engine.jobs().await?;
            println!("Jobs ({})", jobs.len());
            for job in &jobs {
                print_job(&engine, job);
            }
        }
        Commands::Reminder(ReminderCommand::Add {
            title,
            due,
            in_minutes,
            job,
        }) => {
            let due_at = match (due, in_minutes) {
                (Some(due), _) => due,
                (None, Some(minutes)) => minutes_after(engine.now(), minutes)?,
                (None, None) => bail!("either --due or --in-minutes is required"),
            };
            let mut new = NewReminder::new(title, due_at);
            new.job_id = job;
            let reminder = engine.add_reminder(new).await?;
            println!("Added reminder {} due {}", reminder.id, reminder.due_at);
        }
        Commands::Reminder(ReminderCommand::Snooze { id, minutes }) => {
            let until = minutes_after(engine.now(), minutes)?;
            let reminder = engine.snooze_reminder(id, until).await?;
            println!("Snoozed {} until {}", reminder.id, until);
        }
        Commands::Reminder(ReminderCommand::Complete { id }) => {
            engine.complete_reminder(id).await?;
            println!("Completed {id}");
        }
        Commands::Reminder(ReminderCommand::List) => {
            let reminders = engine.reminders().await?;
            println!("Reminders ({})", reminders.len());
            for r in reminders {
                println!("  {} | {:<9} | {} | {}", r.id, r.status.as_str(), r.due_at, r.title);
            }
        }
        Commands::Tick { now } => {
            let report = match now {
                Some(now) => engine.tick_at(now).await?,
                None => engine.tick().await?,
            };
            println!(
                "Evaluated {} jobs: {} transitions, {} breached, {} reminders overdue, {} notifications",
                report.jobs_evaluated,
                report.transitions,
                report.breaches,
                report.reminders_overdue,
                report.notifications
            );
        }
        Commands::Notifications {
            command: Some(NotificationCommand::Read { id }),
            ..
        } => {
            engine.mark_notification_read(id).await?;
            println!("Marked {id} read");
        }
        Commands::Notifications { unread, command: None } => {
            let notifications = if unread {
                engine.unread_notifications().await?
            } else {
                engine.notifications().await?
            };
            for n in notifications {
                let marker = if n.is_read() { ' ' } else { '*' };
                println!("{marker} {} | {} | {}", n.id(), n.timestamp(), n.message());
            }
        }
        Commands::Timeline { job } => {
            for entry in engine.timeline(job).await? {
                println!("  {} | {:?} | {}", entry.timestamp, entry.severity, entry.message);
            }
        }
        Commands::Status => {
            let counts = engine.status_counts().await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Commands::Watch => {
            let ticker = jobwatch_core::Ticker::spawn(engine);
            info!("watching {}; Ctrl-C to stop", cli.state.display());
            tokio::signal::ctrl_c().await?;
            ticker.shutdown_and_join().await;
            save_snapshot(&cli.state, &store.snapshot().await)?;
            return Ok(());
        }
    }

    save_snapshot(&cli.state, &store.snapshot().await)?;
    Ok(())
}

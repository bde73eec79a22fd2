//! Ticker: the single task that owns the `Engine`.
//!
//! Periodic ticks and operator commands are handled by the same loop, so a
//! milestone write can never land in the middle of a tick. A tick that has
//! started always runs to completion; shutdown is only observed between
//! loop iterations.
//!
//! The interval skips missed ticks, and every tick reads the clock afresh,
//! so a process that resumes after a suspension evaluates once against the
//! current time instead of replaying a backlog.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::app::engine::{Engine, TickReport};
use crate::app::status::StatusCounts;
use crate::config::EngineConfig;
use crate::domain::{
    JobId, JobRecord, Milestone, NewJob, NewReminder, Notification, NotificationId, Reminder,
    ReminderId, SlaPolicy, TimelineEntry, Timestamp,
};
use crate::error::{ConfigError, EngineError};

const COMMAND_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum Command {
    Tick(Reply<TickReport>),
    CreateJob(NewJob, Reply<JobRecord>),
    RecordMilestone(JobId, Milestone, Option<Timestamp>, Reply<JobRecord>),
    CorrectMilestone(JobId, Milestone, Timestamp, Reply<JobRecord>),
    UpdatePolicy(JobId, SlaPolicy, Reply<JobRecord>),
    AddReminder(NewReminder, Reply<Reminder>),
    SnoozeReminder(ReminderId, Timestamp, Reply<Reminder>),
    CompleteReminder(ReminderId, Reply<Reminder>),
    MarkNotificationRead(NotificationId, Reply<()>),
    Jobs(Reply<Vec<JobRecord>>),
    Reminders(Reply<Vec<Reminder>>),
    Notifications { unread_only: bool, reply: Reply<Vec<Notification>> },
    Timeline(JobId, Reply<Vec<TimelineEntry>>),
    StatusCounts(Reply<StatusCounts>),
    UpdateConfig(EngineConfig, oneshot::Sender<Result<(), ConfigError>>),
}

/// What the loop last did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerStatus {
    /// Periodic ticks completed successfully.
    pub ticks: u64,
    pub last_report: Option<TickReport>,
    /// Error of the most recent failed tick, cleared by the next success.
    pub last_error: Option<String>,
}

/// Cloneable client of a running `Ticker`.
///
/// Every call is queued behind the tick in progress, if any. Once the
/// ticker has stopped, calls fail with `EngineError::Stopped`.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<TickerStatus>,
}

impl EngineHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)?
    }

    /// Run a tick now, outside the schedule.
    pub async fn tick_now(&self) -> Result<TickReport, EngineError> {
        self.request(Command::Tick).await
    }

    pub async fn create_job(&self, new: NewJob) -> Result<JobRecord, EngineError> {
        self.request(|reply| Command::CreateJob(new, reply)).await
    }

    pub async fn record_milestone(
        &self,
        job_id: JobId,
        milestone: Milestone,
        at: Option<Timestamp>,
    ) -> Result<JobRecord, EngineError> {
        self.request(|reply| Command::RecordMilestone(job_id, milestone, at, reply))
            .await
    }

    pub async fn correct_milestone(
        &self,
        job_id: JobId,
        milestone: Milestone,
        at: Timestamp,
    ) -> Result<JobRecord, EngineError> {
        self.request(|reply| Command::CorrectMilestone(job_id, milestone, at, reply))
            .await
    }

    pub async fn update_policy(&self, job_id: JobId, policy: SlaPolicy) -> Result<JobRecord, EngineError> {
        self.request(|reply| Command::UpdatePolicy(job_id, policy, reply))
            .await
    }

    pub async fn add_reminder(&self, new: NewReminder) -> Result<Reminder, EngineError> {
        self.request(|reply| Command::AddReminder(new, reply)).await
    }

    pub async fn snooze_reminder(&self, id: ReminderId, until: Timestamp) -> Result<Reminder, EngineError> {
        self.request(|reply| Command::SnoozeReminder(id, until, reply))
            .await
    }

    pub async fn complete_reminder(&self, id: ReminderId) -> Result<Reminder, EngineError> {
        self.request(|reply| Command::CompleteReminder(id, reply)).await
    }

    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<(), EngineError> {
        self.request(|reply| Command::MarkNotificationRead(id, reply))
            .await
    }

    pub async fn jobs(&self) -> Result<Vec<JobRecord>, EngineError> {
        self.request(Command::Jobs).await
    }

    pub async fn reminders(&self) -> Result<Vec<Reminder>, EngineError> {
        self.request(Command::Reminders).await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, EngineError> {
        self.request(|reply| Command::Notifications {
            unread_only: false,
            reply,
        })
        .await
    }

    pub async fn unread_notifications(&self) -> Result<Vec<Notification>, EngineError> {
        self.request(|reply| Command::Notifications {
            unread_only: true,
            reply,
        })
        .await
    }

    pub async fn timeline(&self, job_id: JobId) -> Result<Vec<TimelineEntry>, EngineError> {
        self.request(|reply| Command::Timeline(job_id, reply)).await
    }

    pub async fn status_counts(&self) -> Result<StatusCounts, EngineError> {
        self.request(Command::StatusCounts).await
    }

    /// Swap the engine configuration without restarting. A changed tick
    /// interval takes effect from now.
    pub async fn update_config(&self, config: EngineConfig) -> Result<(), ConfigError> {
        let (tx, rx) = oneshot::channel();
        let stopped = || ConfigError::Invalid("engine is stopped".to_string());
        self.commands
            .send(Command::UpdateConfig(config, tx))
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    pub fn status(&self) -> TickerStatus {
        self.status.borrow().clone()
    }
}

/// Running ticker task.
pub struct Ticker {
    handle: EngineHandle,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the loop on the current tokio runtime. The first tick runs
    /// immediately.
    pub fn spawn(engine: Engine) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(TickerStatus::default());

        let join = tokio::spawn(run(engine, commands_rx, shutdown_rx, status_tx));

        Self {
            handle: EngineHandle {
                commands: commands_tx,
                status: status_rx,
            },
            shutdown_tx,
            join,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Ask the loop to stop after the current tick or command.
    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            warn!(error = %e, "ticker task ended abnormally");
        }
    }
}

fn new_interval(config: &EngineConfig, start: Instant) -> Interval {
    let mut interval = tokio::time::interval_at(start, config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run(
    mut engine: Engine,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<TickerStatus>,
) {
    let mut interval = new_interval(engine.config(), Instant::now());
    info!(interval_secs = engine.config().tick_interval_secs, "ticker started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // Ticker dropped without an explicit shutdown.
                    break;
                }
            }
            _ = interval.tick() => {
                let result = engine.tick().await;
                status_tx.send_modify(|status| match result {
                    Ok(report) => {
                        status.ticks += 1;
                        status.last_report = Some(report);
                        status.last_error = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "tick failed; next tick retries");
                        status.last_error = Some(e.to_string());
                    }
                });
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                handle_command(&mut engine, &mut interval, command).await;
            }
        }
    }

    info!("ticker stopped");
}

async fn handle_command(engine: &mut Engine, interval: &mut Interval, command: Command) {
    // Reply send errors mean the caller gave up waiting; nothing to do.
    match command {
        Command::Tick(reply) => {
            let _ = reply.send(engine.tick().await);
        }
        Command::CreateJob(new, reply) => {
            let _ = reply.send(engine.create_job(new).await);
        }
        Command::RecordMilestone(job_id, milestone, at, reply) => {
            let _ = reply.send(engine.record_milestone(job_id, milestone, at).await);
        }
        Command::CorrectMilestone(job_id, milestone, at, reply) => {
            let _ = reply.send(engine.correct_milestone(job_id, milestone, at).await);
        }
        Command::UpdatePolicy(job_id, policy, reply) => {
            let _ = reply.send(engine.update_policy(job_id, policy).await);
        }
        Command::AddReminder(new, reply) => {
            let _ = reply.send(engine.add_reminder(new).await);
        }
        Command::SnoozeReminder(id, until, reply) => {
            let _ = reply.send(engine.snooze_reminder(id, until).await);
        }
        Command::CompleteReminder(id, reply) => {
            let _ = reply.send(engine.complete_reminder(id).await);
        }
        Command::MarkNotificationRead(id, reply) => {
            let _ = reply.send(engine.mark_notification_read(id).await);
        }
        Command::Jobs(reply) => {
            let _ = reply.send(engine.jobs().await);
        }
        Command::Reminders(reply) => {
            let _ = reply.send(engine.reminders().await);
        }
        Command::Notifications { unread_only, reply } => {
            let result = if unread_only {
                engine.unread_notifications().await
            } else {
                engine.notifications().await
            };
            let _ = reply.send(result);
        }
        Command::Timeline(job_id, reply) => {
            let _ = reply.send(engine.timeline(job_id).await);
        }
        Command::StatusCounts(reply) => {
            let _ = reply.send(engine.status_counts().await);
        }
        Command::UpdateConfig(config, reply) => {
            if let Err(e) = config.validate() {
                let _ = reply.send(Err(e));
                return;
            }
            if config.tick_interval_secs != engine.config().tick_interval_secs {
                let Some(start) = Instant::now().checked_add(config.tick_interval()) else {
                    let _ = reply.send(Err(ConfigError::Invalid(format!(
                        "tick_interval_secs {} is out of range",
                        config.tick_interval_secs
                    ))));
                    return;
                };
                *interval = new_interval(&config, start);
            }
            info!(
                interval_secs = config.tick_interval_secs,
                amber_threshold_percent = config.amber_threshold_percent,
                "config reloaded"
            );
            engine.set_config(config);
            let _ = reply.send(Ok(()));
        }
    }
}

//! Engine: tick orchestration and operator writes over an `EngineStore`.
//!
//! Every method reads a snapshot, computes the full set of changes in
//! memory, and writes them back with a single `commit`. A failed commit
//! leaves the store untouched; the next tick recomputes the same result.
//!
//! `Engine` takes `&mut self` for writes. Run it inside a `Ticker` to get
//! ticks and operator writes serialised on one queue.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::status::StatusCounts;
use crate::config::EngineConfig;
use crate::domain::{
    JobId, JobRecord, Milestone, NewJob, NewReminder, Notification, NotificationId, Reminder,
    ReminderId, SlaPolicy, TimelineEntry, Timestamp, ValidationError,
};
use crate::engine::{self, TrafficLight, emitter};
use crate::error::EngineError;
use crate::ports::{Clock, EngineStore, IdGenerator, StoreError, TickBatch};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub now: Timestamp,
    pub jobs_evaluated: usize,
    /// Jobs whose status changed (either direction).
    pub transitions: usize,
    pub breaches: usize,
    pub reminders_overdue: usize,
    pub reminders_woken: usize,
    pub notifications: usize,
}

pub struct Engine {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: EngineConfig,
}

impl Engine {
    /// Use `EngineBuilder` unless the config is already validated.
    pub fn new(
        store: Arc<dyn EngineStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Evaluate the whole working set against the clock's current time.
    pub async fn tick(&mut self) -> Result<TickReport, EngineError> {
        let now = self.clock.now();
        self.tick_at(now).await
    }

    /// Evaluate the whole working set at `now`.
    pub async fn tick_at(&mut self, now: Timestamp) -> Result<TickReport, EngineError> {
        let working_set = self.store.load_working_set().await?;
        let mut batch = TickBatch::default();
        let mut report = TickReport {
            now,
            jobs_evaluated: working_set.jobs.len(),
            transitions: 0,
            breaches: 0,
            reminders_overdue: 0,
            reminders_woken: 0,
            notifications: 0,
        };

        for mut job in working_set.jobs {
            let previous = job.status;
            self.refresh_status(&mut job, now, &mut batch);
            if job.status != previous {
                report.transitions += 1;
            }
            if job.status.is_breached() {
                report.breaches += 1;
            }
            batch.jobs.push(job);
        }

        let sweep = engine::sweep(&working_set.reminders, now, &*self.ids);
        report.reminders_overdue = sweep.overdue_count();
        report.reminders_woken = sweep.woken_count();
        for reminder in &sweep.updated {
            debug!(reminder_id = %reminder.id, status = reminder.status.as_str(), "reminder updated");
        }
        batch.reminders = sweep.updated;
        batch.notifications.extend(sweep.notifications);
        report.notifications = batch.notifications.len();

        if let Err(e) = self.store.commit(batch).await {
            warn!(error = %e, %now, "tick commit failed; batch dropped");
            return Err(e.into());
        }

        info!(
            %now,
            jobs = report.jobs_evaluated,
            transitions = report.transitions,
            breached = report.breaches,
            reminders_overdue = report.reminders_overdue,
            reminders_woken = report.reminders_woken,
            notifications = report.notifications,
            "tick complete"
        );
        Ok(report)
    }

    /// Re-evaluate `job` at `now`, store the new snapshot on it, and queue
    /// whatever the transition emits.
    fn refresh_status(&self, job: &mut JobRecord, now: Timestamp, batch: &mut TickBatch) {
        let previous = job.status;
        let current = engine::evaluate(&job.policy, &job.milestones, now);

        if previous != current {
            debug!(job_id = %job.id, from = %previous, to = %current, "status changed");
        }
        if let Some(stage) = current.breached_stage() {
            job.audit.note(stage, now);
        }

        let emission = engine::on_tick(previous, current, job, now, &*self.ids);
        batch.notifications.extend(emission.notifications);
        batch.timeline.extend(emission.timeline);

        job.status = current;
        job.status_evaluated_at = Some(now);
    }

    /// Audit stages a milestone write closed after their budget ran out.
    /// A tick may never have observed them while they were open.
    fn note_overruns(job: &mut JobRecord) {
        for (stage, deadline) in engine::overrun_stages(&job.policy, &job.milestones) {
            if !job.audit.stages.contains(&stage) {
                debug!(job_id = %job.id, %stage, %deadline, "closed after its deadline");
            }
            job.audit.note(stage, deadline);
        }
    }

    async fn load_job(&self, id: JobId) -> Result<JobRecord, EngineError> {
        self.store.job(id).await?.ok_or(EngineError::JobNotFound(id))
    }

    async fn load_reminder(&self, id: ReminderId) -> Result<Reminder, EngineError> {
        self.store
            .reminder(id)
            .await?
            .ok_or(EngineError::ReminderNotFound(id))
    }

    /// Commit a job write together with its timeline entry and any status
    /// transition it caused.
    async fn commit_job(
        &self,
        mut job: JobRecord,
        entry: TimelineEntry,
        now: Timestamp,
    ) -> Result<JobRecord, EngineError> {
        let mut batch = TickBatch {
            timeline: vec![entry],
            ..TickBatch::default()
        };
        self.refresh_status(&mut job, now, &mut batch);
        batch.jobs.push(job.clone());
        self.store.commit(batch).await?;
        Ok(job)
    }

    pub async fn create_job(&mut self, new: NewJob) -> Result<JobRecord, EngineError> {
        let now = self.clock.now();
        let policy = match new.policy {
            Some(policy) => {
                policy.validate()?;
                policy
            }
            None => *self.config.policies.for_priority(new.priority),
        };
        let logged = new.logged_at.unwrap_or(now);

        let mut job = JobRecord::new(self.ids.generate_job_id(), new.reference, new.priority, policy, logged);
        job.customer = new.customer;

        let entry = emitter::milestone_recorded(job.id, Milestone::Logged, logged, now, &*self.ids);
        let job = self.commit_job(job, entry, now).await?;
        info!(job_id = %job.id, reference = %job.reference, priority = %job.priority, "job created");
        Ok(job)
    }

    /// Record a milestone for the first time. `at` defaults to now.
    pub async fn record_milestone(
        &mut self,
        job_id: JobId,
        milestone: Milestone,
        at: Option<Timestamp>,
    ) -> Result<JobRecord, EngineError> {
        let now = self.clock.now();
        let at = at.unwrap_or(now);
        let mut job = self.load_job(job_id).await?;

        job.milestones.record(milestone, at)?;
        Self::note_overruns(&mut job);

        let entry = emitter::milestone_recorded(job.id, milestone, at, now, &*self.ids);
        let job = self.commit_job(job, entry, now).await?;
        info!(%job_id, %milestone, at = %at, "milestone recorded");
        Ok(job)
    }

    /// Re-time an already recorded milestone.
    pub async fn correct_milestone(
        &mut self,
        job_id: JobId,
        milestone: Milestone,
        at: Timestamp,
    ) -> Result<JobRecord, EngineError> {
        let now = self.clock.now();
        let mut job = self.load_job(job_id).await?;

        let old = job.milestones.correct(milestone, at)?;
        Self::note_overruns(&mut job);

        let entry = emitter::milestone_corrected(job.id, milestone, old, at, now, &*self.ids);
        let job = self.commit_job(job, entry, now).await?;
        info!(%job_id, %milestone, from = %old, to = %at, "milestone corrected");
        Ok(job)
    }

    pub async fn update_policy(&mut self, job_id: JobId, policy: SlaPolicy) -> Result<JobRecord, EngineError> {
        let now = self.clock.now();
        let mut job = self.load_job(job_id).await?;

        if job.is_completed() {
            return Err(ValidationError::PolicyLocked(job_id).into());
        }
        policy.validate()?;

        let entry = emitter::policy_updated(job.id, &job.policy, &policy, now, &*self.ids);
        job.policy = policy;
        let job = self.commit_job(job, entry, now).await?;
        info!(%job_id, "policy updated");
        Ok(job)
    }

    pub async fn add_reminder(&mut self, new: NewReminder) -> Result<Reminder, EngineError> {
        let now = self.clock.now();
        if let Some(job_id) = new.job_id {
            self.load_job(job_id).await?;
        }

        let mut reminder = Reminder::new(self.ids.generate_reminder_id(), new.title, new.due_at, now);
        reminder.job_id = new.job_id;

        self.store
            .commit(TickBatch {
                reminders: vec![reminder.clone()],
                ..TickBatch::default()
            })
            .await?;
        info!(reminder_id = %reminder.id, due_at = %reminder.due_at, "reminder added");
        Ok(reminder)
    }

    pub async fn snooze_reminder(&mut self, id: ReminderId, until: Timestamp) -> Result<Reminder, EngineError> {
        let now = self.clock.now();
        let mut reminder = self.load_reminder(id).await?;
        reminder.snooze(until, now)?;
        self.save_reminder(&reminder).await?;
        info!(reminder_id = %id, until = %until, "reminder snoozed");
        Ok(reminder)
    }

    pub async fn complete_reminder(&mut self, id: ReminderId) -> Result<Reminder, EngineError> {
        let mut reminder = self.load_reminder(id).await?;
        reminder.complete()?;
        self.save_reminder(&reminder).await?;
        info!(reminder_id = %id, "reminder completed");
        Ok(reminder)
    }

    async fn save_reminder(&self, reminder: &Reminder) -> Result<(), EngineError> {
        self.store
            .commit(TickBatch {
                reminders: vec![reminder.clone()],
                ..TickBatch::default()
            })
            .await?;
        Ok(())
    }

    pub async fn jobs(&self) -> Result<Vec<JobRecord>, EngineError> {
        Ok(self.store.load_working_set().await?.jobs)
    }

    pub async fn reminders(&self) -> Result<Vec<Reminder>, EngineError> {
        Ok(self.store.load_working_set().await?.reminders)
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, EngineError> {
        Ok(self.store.notifications().await?)
    }

    pub async fn unread_notifications(&self) -> Result<Vec<Notification>, EngineError> {
        let mut all = self.store.notifications().await?;
        all.retain(|n| !n.is_read());
        Ok(all)
    }

    pub async fn mark_notification_read(&mut self, id: NotificationId) -> Result<(), EngineError> {
        match self.store.mark_notification_read(id).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(EngineError::NotificationNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn timeline(&self, job_id: JobId) -> Result<Vec<TimelineEntry>, EngineError> {
        self.load_job(job_id).await?;
        Ok(self.store.timeline(job_id).await?)
    }

    /// Legacy traffic light for a stored job at the clock's current time.
    pub fn traffic_light(&self, job: &JobRecord) -> TrafficLight {
        engine::traffic_light(job, self.clock.now(), self.config.amber_threshold_percent)
    }

    pub async fn status_counts(&self) -> Result<StatusCounts, EngineError> {
        let working_set = self.store.load_working_set().await?;
        let notifications = self.store.notifications().await?;
        Ok(StatusCounts::collect(
            &working_set.jobs,
            &working_set.reminders,
            &notifications,
        ))
    }
}

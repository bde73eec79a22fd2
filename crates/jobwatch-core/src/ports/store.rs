//! EngineStore port: the accessor boundary to whatever persists the
//! working set.
//!
//! # Reads
//!
//! Reads return owned snapshots. Nothing handed out aliases the store, so
//! the engine evaluates without holding any lock.
//!
//! # Writes
//!
//! Every write goes through `commit` as one `TickBatch`, which an
//! implementation must apply entirely or not at all. Jobs and reminders are
//! upserted. Notifications and timeline entries are appended, and an id that
//! already exists is a `StoreError::Conflict`. The only in-place change to a
//! notification is `mark_notification_read`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{JobId, JobRecord, Notification, NotificationId, Reminder, ReminderId, TimelineEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Everything a tick evaluates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    pub jobs: Vec<JobRecord>,
    pub reminders: Vec<Reminder>,
}

/// One atomic write.
///
/// `jobs` and `reminders` are upserts keyed by id; `notifications` and
/// `timeline` are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickBatch {
    pub jobs: Vec<JobRecord>,
    pub reminders: Vec<Reminder>,
    pub notifications: Vec<Notification>,
    pub timeline: Vec<TimelineEntry>,
}

impl TickBatch {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
            && self.reminders.is_empty()
            && self.notifications.is_empty()
            && self.timeline.is_empty()
    }
}

#[async_trait]
pub trait EngineStore: Send + Sync {
    async fn load_working_set(&self) -> Result<WorkingSet, StoreError>;

    async fn job(&self, id: JobId) -> Result<Option<JobRecord>, StoreError>;

    async fn reminder(&self, id: ReminderId) -> Result<Option<Reminder>, StoreError>;

    async fn commit(&self, batch: TickBatch) -> Result<(), StoreError>;

    /// All notifications, oldest first.
    async fn notifications(&self) -> Result<Vec<Notification>, StoreError>;

    /// Returns `StoreError::NotFound` for an unknown id.
    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), StoreError>;

    /// Timeline of one job, oldest first.
    async fn timeline(&self, job_id: JobId) -> Result<Vec<TimelineEntry>, StoreError>;
}

//! In-memory working set.
//!
//! # Locking
//!
//! The whole state sits behind one async mutex, so a batch is validated and
//! applied under a single lock and readers never see half of it.
//!
//! # Ordering
//!
//! Jobs and reminders live in maps keyed by their ULID id. Ids minted in
//! different milliseconds therefore list in creation order; ids minted in
//! the same millisecond list in random order. Notifications and timeline
//! entries are append-only vectors and keep their insertion order.
//!
//! # Conflicts
//!
//! Notification and timeline ids are indexed, so a commit checks each new
//! entry in constant time. A batch repeating an id, against the store or
//! within itself, is rejected as a whole.
//!
//! `StoreSnapshot` is the serialisable form used by the CLI state file.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{
    JobId, JobRecord, Notification, NotificationId, Reminder, ReminderId, TimelineEntry, TimelineEntryId,
};
use crate::ports::{EngineStore, StoreError, TickBatch, WorkingSet};

/// Plain-data dump of an `InMemoryStore`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Default)]
struct StoreState {
    jobs: BTreeMap<JobId, JobRecord>,
    reminders: BTreeMap<ReminderId, Reminder>,
    /// Append-only.
    notifications: Vec<Notification>,
    /// Position of each notification in `notifications`.
    notification_index: HashMap<NotificationId, usize>,
    /// Append-only, all jobs interleaved.
    timeline: Vec<TimelineEntry>,
    timeline_ids: HashSet<TimelineEntryId>,
}

impl StoreState {
    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut state = Self {
            jobs: snapshot.jobs.into_iter().map(|j| (j.id, j)).collect(),
            reminders: snapshot.reminders.into_iter().map(|r| (r.id, r)).collect(),
            ..Self::default()
        };
        state.append_notifications(snapshot.notifications);
        state.append_timeline(snapshot.timeline);
        state
    }

    /// Reject the batch before anything is applied.
    fn check(&self, batch: &TickBatch) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for n in &batch.notifications {
            if !seen.insert(n.id()) || self.notification_index.contains_key(&n.id()) {
                return Err(StoreError::Conflict(format!("notification {} already exists", n.id())));
            }
        }

        let mut seen = HashSet::new();
        for t in &batch.timeline {
            if !seen.insert(t.id) || self.timeline_ids.contains(&t.id) {
                return Err(StoreError::Conflict(format!("timeline entry {} already exists", t.id)));
            }
        }

        Ok(())
    }

    fn apply(&mut self, batch: TickBatch) {
        for job in batch.jobs {
            self.jobs.insert(job.id, job);
        }
        for reminder in batch.reminders {
            self.reminders.insert(reminder.id, reminder);
        }
        self.append_notifications(batch.notifications);
        self.append_timeline(batch.timeline);
    }

    fn append_notifications(&mut self, notifications: Vec<Notification>) {
        for n in notifications {
            self.notification_index.insert(n.id(), self.notifications.len());
            self.notifications.push(n);
        }
    }

    fn append_timeline(&mut self, entries: Vec<TimelineEntry>) {
        self.timeline_ids.extend(entries.iter().map(|t| t.id));
        self.timeline.extend(entries);
    }
}

pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(StoreState::from_snapshot(snapshot)),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        StoreSnapshot {
            jobs: state.jobs.values().cloned().collect(),
            reminders: state.reminders.values().cloned().collect(),
            notifications: state.notifications.clone(),
            timeline: state.timeline.clone(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineStore for InMemoryStore {
    async fn load_working_set(&self) -> Result<WorkingSet, StoreError> {
        let state = self.state.lock().await;
        Ok(WorkingSet {
            jobs: state.jobs.values().cloned().collect(),
            reminders: state.reminders.values().cloned().collect(),
        })
    }

    async fn job(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.jobs.get(&id).cloned())
    }

    async fn reminder(&self, id: ReminderId) -> Result<Option<Reminder>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.reminders.get(&id).cloned())
    }

    async fn commit(&self, batch: TickBatch) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check(&batch)?;
        state.apply(batch);
        Ok(())
    }

    async fn notifications(&self) -> Result<Vec<Notification>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.notifications.clone())
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let position = *state
            .notification_index
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        state.notifications[position].mark_read();
        Ok(())
    }

    async fn timeline(&self, job_id: JobId) -> Result<Vec<TimelineEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .timeline
            .iter()
            .filter(|t| t.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NotificationKind, Priority, SlaPolicy, TimelineKind, Timestamp};
    use crate::ports::{FixedClock, IdGenerator, UlidGenerator};
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn ids() -> UlidGenerator<FixedClock> {
        UlidGenerator::new(FixedClock::new(t0()))
    }

    fn job(ids: &dyn IdGenerator) -> JobRecord {
        JobRecord::new(
            ids.generate_job_id(),
            "JOB-1",
            Priority::Urgent,
            SlaPolicy::for_priority(Priority::Urgent),
            t0(),
        )
    }

    fn notification(ids: &dyn IdGenerator) -> Notification {
        Notification::new(ids.generate_notification_id(), NotificationKind::SlaBreach, "breach", t0(), None)
    }

    #[tokio::test]
    async fn commit_then_load() {
        let ids = ids();
        let store = InMemoryStore::new();
        let job = job(&ids);
        let reminder = Reminder::new(ids.generate_reminder_id(), "call back", t0(), t0());

        store
            .commit(TickBatch {
                jobs: vec![job.clone()],
                reminders: vec![reminder.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        let ws = store.load_working_set().await.unwrap();
        assert_eq!(ws.jobs, vec![job.clone()]);
        assert_eq!(ws.reminders, vec![reminder]);
        assert_eq!(store.job(job.id).await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn jobs_are_upserted() {
        let ids = ids();
        let store = InMemoryStore::new();
        let mut job = job(&ids);
        store
            .commit(TickBatch {
                jobs: vec![job.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        job.reference = "JOB-1b".to_string();
        store
            .commit(TickBatch {
                jobs: vec![job.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        let ws = store.load_working_set().await.unwrap();
        assert_eq!(ws.jobs.len(), 1);
        assert_eq!(ws.jobs[0].reference, "JOB-1b");
    }

    #[tokio::test]
    async fn jobs_list_by_id_not_by_commit() {
        let clock = std::sync::Arc::new(FixedClock::new(t0()));
        let ids = UlidGenerator::new(clock.clone());
        let earlier = job(&ids);
        clock.advance(chrono::Duration::milliseconds(1));
        let later = job(&ids);

        let store = InMemoryStore::new();
        for job in [later.clone(), earlier.clone()] {
            store
                .commit(TickBatch {
                    jobs: vec![job],
                    ..TickBatch::default()
                })
                .await
                .unwrap();
        }

        let listed: Vec<_> = store.load_working_set().await.unwrap().jobs.iter().map(|j| j.id).collect();
        assert_eq!(listed, vec![earlier.id, later.id]);
    }

    #[tokio::test]
    async fn conflicting_batch_applies_nothing() {
        let ids = ids();
        let store = InMemoryStore::new();
        let existing = notification(&ids);
        store
            .commit(TickBatch {
                notifications: vec![existing.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        let job = job(&ids);
        let err = store
            .commit(TickBatch {
                jobs: vec![job.clone()],
                notifications: vec![existing],
                ..TickBatch::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.job(job.id).await.unwrap(), None);
        assert_eq!(store.notifications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_timeline_id_is_a_conflict() {
        let ids = ids();
        let store = InMemoryStore::new();
        let job = job(&ids);
        let entry = TimelineEntry::info(ids.generate_timeline_id(), job.id, TimelineKind::MilestoneRecorded, "x", t0());

        let err = store
            .commit(TickBatch {
                timeline: vec![entry.clone(), entry.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.timeline(job.id).await.unwrap().is_empty());

        store
            .commit(TickBatch {
                timeline: vec![entry.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();
        let err = store
            .commit(TickBatch {
                timeline: vec![entry],
                ..TickBatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.timeline(job.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restored_store_still_detects_conflicts() {
        let ids = ids();
        let store = InMemoryStore::new();
        let n = notification(&ids);
        store
            .commit(TickBatch {
                notifications: vec![notification(&ids), n.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        let restored = InMemoryStore::from_snapshot(store.snapshot().await);
        let err = restored
            .commit(TickBatch {
                notifications: vec![n.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        restored.mark_notification_read(n.id()).await.unwrap();
        let stored = restored.notifications().await.unwrap();
        assert!(!stored[0].is_read());
        assert!(stored[1].is_read());
    }

    #[tokio::test]
    async fn mark_read_flips_only_the_flag() {
        let ids = ids();
        let store = InMemoryStore::new();
        let n = notification(&ids);
        store
            .commit(TickBatch {
                notifications: vec![n.clone()],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        store.mark_notification_read(n.id()).await.unwrap();

        let stored = &store.notifications().await.unwrap()[0];
        assert!(stored.is_read());
        assert_eq!(stored.message(), n.message());
        assert_eq!(stored.timestamp(), n.timestamp());
    }

    #[tokio::test]
    async fn mark_read_unknown_id_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .mark_notification_read(ids().generate_notification_id())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn timeline_is_filtered_per_job() {
        let ids = ids();
        let store = InMemoryStore::new();
        let a = job(&ids);
        let b = job(&ids);
        let entry = |job_id| {
            TimelineEntry::info(ids.generate_timeline_id(), job_id, TimelineKind::MilestoneRecorded, "x", t0())
        };

        store
            .commit(TickBatch {
                timeline: vec![entry(a.id), entry(b.id), entry(a.id)],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        assert_eq!(store.timeline(a.id).await.unwrap().len(), 2);
        assert_eq!(store.timeline(b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_survives_json() {
        let ids = ids();
        let store = InMemoryStore::new();
        store
            .commit(TickBatch {
                jobs: vec![job(&ids)],
                notifications: vec![notification(&ids)],
                ..TickBatch::default()
            })
            .await
            .unwrap();

        let json = serde_json::to_string(&store.snapshot().await).unwrap();
        let restored = InMemoryStore::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot().await, store.snapshot().await);
    }
}

//! Breach/notification emitter.
//!
//! Turns a status transition into the records that must be persisted. It
//! performs no I/O: the caller commits what is returned together with the
//! new status snapshot.
//!
//! | previous            | current             | notification | timeline          |
//! |---------------------|---------------------|--------------|-------------------|
//! | on_track            | breached            | yes          | `SlaBreached`     |
//! | breached(stage A)   | breached(stage B)   | yes          | `SlaBreached`     |
//! | breached(stage A)   | breached(stage A)   | no           | none              |
//! | breached            | on_track            | no           | `StatusCorrected` |
//! | on_track            | on_track            | no           | none              |

use crate::domain::{
    EntityRef, JobId, JobRecord, Milestone, Notification, NotificationKind, SlaPolicy, SlaStatus,
    TimelineEntry, TimelineKind, Timestamp,
};
use crate::ports::IdGenerator;

/// Records produced by one evaluation of one job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Emission {
    pub notifications: Vec<Notification>,
    pub timeline: Vec<TimelineEntry>,
}

impl Emission {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.timeline.is_empty()
    }
}

/// Compare the stored snapshot with the fresh evaluation of `job`.
pub fn on_tick(
    previous: SlaStatus,
    current: SlaStatus,
    job: &JobRecord,
    now: Timestamp,
    ids: &dyn IdGenerator,
) -> Emission {
    let mut emission = Emission::default();

    match (previous.breached_stage(), current.breached_stage()) {
        (before, Some(stage)) if before != Some(stage) => {
            let reason = current.reason().unwrap_or_default();
            emission.notifications.push(Notification::new(
                ids.generate_notification_id(),
                NotificationKind::SlaBreach,
                format!("{} breached its {} SLA: {}", job.reference, stage, reason),
                now,
                Some(EntityRef::Job(job.id)),
            ));
            emission.timeline.push(TimelineEntry::warning(
                ids.generate_timeline_id(),
                job.id,
                TimelineKind::SlaBreached,
                reason,
                now,
            ));
        }
        (Some(stage), None) => {
            let message = if job.is_completed() {
                format!("{stage} breach closed by completion")
            } else {
                format!("{stage} breach cleared")
            };
            emission.timeline.push(TimelineEntry::info(
                ids.generate_timeline_id(),
                job.id,
                TimelineKind::StatusCorrected,
                message,
                now,
            ));
        }
        _ => {}
    }

    emission
}

/// Informational entry for a first-time milestone write.
///
/// Always produced, independent of the SLA status.
pub fn milestone_recorded(
    job_id: JobId,
    milestone: Milestone,
    at: Timestamp,
    now: Timestamp,
    ids: &dyn IdGenerator,
) -> TimelineEntry {
    TimelineEntry::info(
        ids.generate_timeline_id(),
        job_id,
        TimelineKind::MilestoneRecorded,
        format!("{milestone} at {}", at.to_rfc3339()),
        now,
    )
}

pub fn milestone_corrected(
    job_id: JobId,
    milestone: Milestone,
    old: Timestamp,
    new: Timestamp,
    now: Timestamp,
    ids: &dyn IdGenerator,
) -> TimelineEntry {
    TimelineEntry::info(
        ids.generate_timeline_id(),
        job_id,
        TimelineKind::MilestoneCorrected,
        format!("{milestone} corrected from {} to {}", old.to_rfc3339(), new.to_rfc3339()),
        now,
    )
}

pub fn policy_updated(
    job_id: JobId,
    old: &SlaPolicy,
    new: &SlaPolicy,
    now: Timestamp,
    ids: &dyn IdGenerator,
) -> TimelineEntry {
    TimelineEntry::info(
        ids.generate_timeline_id(),
        job_id,
        TimelineKind::PolicyUpdated,
        format!(
            "SLA policy changed from {}/{}/{} to {}/{}/{} minutes",
            old.accept_within,
            old.on_site_within,
            old.complete_within,
            new.accept_within,
            new.on_site_within,
            new.complete_within
        ),
        now,
    )
}

//! Overview counts for dashboards and the CLI.

use serde::{Deserialize, Serialize};

use crate::domain::{JobRecord, Notification, Reminder, ReminderState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub jobs_on_track: usize,
    pub jobs_breached: usize,
    pub jobs_completed: usize,
    /// Jobs that breached at some point, including completed ones.
    pub jobs_ever_breached: usize,
    pub reminders_active: usize,
    pub reminders_overdue: usize,
    pub reminders_snoozed: usize,
    pub reminders_completed: usize,
    pub unread_notifications: usize,
}

impl StatusCounts {
    /// Counts from stored snapshots. Job status is the one written by the
    /// last tick.
    pub fn collect(jobs: &[JobRecord], reminders: &[Reminder], notifications: &[Notification]) -> Self {
        let mut counts = StatusCounts::default();

        for job in jobs {
            if job.is_completed() {
                counts.jobs_completed += 1;
            } else if job.status.is_breached() {
                counts.jobs_breached += 1;
            } else {
                counts.jobs_on_track += 1;
            }
            if job.audit.was_breached() {
                counts.jobs_ever_breached += 1;
            }
        }

        for reminder in reminders {
            match reminder.status {
                ReminderState::Active => counts.reminders_active += 1,
                ReminderState::Overdue => counts.reminders_overdue += 1,
                ReminderState::Snoozed => counts.reminders_snoozed += 1,
                ReminderState::Completed => counts.reminders_completed += 1,
            }
        }

        counts.unread_notifications = notifications.iter().filter(|n| !n.is_read()).count();
        counts
    }
}

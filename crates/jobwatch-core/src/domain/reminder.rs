//! Reminders and their state machine.
//!
//! State transitions:
//! - Active -> Overdue        (sweep, `now > due_at`)
//! - Active | Overdue -> Snoozed (operator)
//! - Snoozed -> Active        (sweep, `now >= snoozed_until`)
//! - any non-completed -> Completed (operator, terminal)

use serde::{Deserialize, Serialize};

use super::Timestamp;
use super::errors::ValidationError;
use super::ids::{JobId, ReminderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    Active,
    Overdue,
    Completed,
    Snoozed,
}

impl ReminderState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, ReminderState::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderState::Active => "active",
            ReminderState::Overdue => "overdue",
            ReminderState::Completed => "completed",
            ReminderState::Snoozed => "snoozed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub due_at: Timestamp,
    pub status: ReminderState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub created_at: Timestamp,
}

impl Reminder {
    pub fn new(id: ReminderId, title: impl Into<String>, due_at: Timestamp, created_at: Timestamp) -> Self {
        Self {
            id,
            title: title.into(),
            due_at,
            status: ReminderState::Active,
            snoozed_until: None,
            job_id: None,
            created_at,
        }
    }

    /// Active and past its due time.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == ReminderState::Active && now > self.due_at
    }

    /// Snoozed and the snooze has run out.
    ///
    /// A snoozed reminder without a `snoozed_until` is treated as already
    /// expired so it cannot stay hidden forever.
    pub fn snooze_expired(&self, now: Timestamp) -> bool {
        self.status == ReminderState::Snoozed && self.snoozed_until.is_none_or(|until| now >= until)
    }

    pub fn mark_overdue(&mut self) {
        self.status = ReminderState::Overdue;
    }

    pub fn wake(&mut self) {
        self.status = ReminderState::Active;
        self.snoozed_until = None;
    }

    pub fn snooze(&mut self, until: Timestamp, now: Timestamp) -> Result<(), ValidationError> {
        if self.status.is_terminal() {
            return Err(ValidationError::ReminderCompleted(self.id));
        }
        if until <= now {
            return Err(ValidationError::SnoozeInPast { until, now });
        }
        self.status = ReminderState::Snoozed;
        self.snoozed_until = Some(until);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), ValidationError> {
        if self.status.is_terminal() {
            return Err(ValidationError::ReminderCompleted(self.id));
        }
        self.status = ReminderState::Completed;
        self.snoozed_until = None;
        Ok(())
    }
}

/// Input for creating a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    pub due_at: Timestamp,
    #[serde(default)]
    pub job_id: Option<JobId>,
}

impl NewReminder {
    pub fn new(title: impl Into<String>, due_at: Timestamp) -> Self {
        Self {
            title: title.into(),
            due_at,
            job_id: None,
        }
    }

    pub fn for_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

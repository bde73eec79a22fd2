//! Validation errors raised at the write boundary.
//!
//! Everything that could make the evaluator see an invalid chain or budget
//! is rejected here, before it reaches the working set.

use thiserror::Error;

use super::Timestamp;
use super::ids::{JobId, ReminderId};
use super::milestones::Milestone;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {minutes} minutes)")]
    NegativeDuration { field: &'static str, minutes: i64 },

    #[error("{field} of {minutes} minutes is too large to represent")]
    DurationOutOfRange { field: &'static str, minutes: i64 },

    #[error("milestone {0} is already recorded")]
    MilestoneAlreadyRecorded(Milestone),

    #[error("milestone {0} has not been recorded yet")]
    MilestoneNotRecorded(Milestone),

    #[error("milestone {milestone} requires {requires} to be recorded first")]
    MilestonePrerequisiteMissing { milestone: Milestone, requires: Milestone },

    #[error("milestone {milestone} at {at} would precede {previous} at {previous_at}")]
    MilestoneOutOfOrder {
        milestone: Milestone,
        at: Timestamp,
        previous: Milestone,
        previous_at: Timestamp,
    },

    #[error("SLA policy of {0} is locked because the job is completed")]
    PolicyLocked(JobId),

    #[error("reminder {0} is completed")]
    ReminderCompleted(ReminderId),

    #[error("snooze target {until} is not after {now}")]
    SnoozeInPast { until: Timestamp, now: Timestamp },

    #[error("unknown milestone: {0}")]
    UnknownMilestone(String),

    #[error("unknown priority: {0}")]
    UnknownPriority(String),
}

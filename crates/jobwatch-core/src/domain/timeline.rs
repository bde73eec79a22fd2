//! Job timeline (audit trail) entries.

use serde::{Deserialize, Serialize};

use super::Timestamp;
use super::ids::{JobId, TimelineEntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    MilestoneRecorded,
    MilestoneCorrected,
    PolicyUpdated,
    SlaBreached,
    /// A breach no longer holds (late milestone, correction, completion).
    StatusCorrected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: TimelineEntryId,
    pub job_id: JobId,
    pub kind: TimelineKind,
    pub severity: Severity,
    pub message: String,
    pub timestamp: Timestamp,
}

impl TimelineEntry {
    pub fn info(id: TimelineEntryId, job_id: JobId, kind: TimelineKind, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id,
            job_id,
            kind,
            severity: Severity::Info,
            message: message.into(),
            timestamp,
        }
    }

    pub fn warning(id: TimelineEntryId, job_id: JobId, kind: TimelineKind, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::info(id, job_id, kind, message, timestamp)
        }
    }
}

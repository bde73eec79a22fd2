//! Job record: policy + milestones + last computed status snapshot.

use serde::{Deserialize, Serialize};

use super::Timestamp;
use super::ids::JobId;
use super::milestones::{JobMilestones, Milestone};
use super::policy::{Priority, SlaPolicy};
use super::status::{BreachAudit, SlaStatus};

/// A tracked job.
///
/// Design:
/// - `milestones` and `policy` are the ground truth.
/// - `status` / `status_evaluated_at` are the display snapshot written by the
///   last tick; they are compared against the new evaluation to detect a
///   transition and are never fed back into `evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,

    /// Operator-facing reference (e.g. "JOB-1042").
    pub reference: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    pub policy: SlaPolicy,
    pub milestones: JobMilestones,

    #[serde(default)]
    pub status: SlaStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_evaluated_at: Option<Timestamp>,

    #[serde(default)]
    pub audit: BreachAudit,
}

impl JobRecord {
    pub fn new(id: JobId, reference: impl Into<String>, priority: Priority, policy: SlaPolicy, logged: Timestamp) -> Self {
        Self {
            id,
            reference: reference.into(),
            customer: None,
            priority,
            policy,
            milestones: JobMilestones::new(logged),
            status: SlaStatus::OnTrack,
            status_evaluated_at: None,
            audit: BreachAudit::default(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.milestones.is_completed()
    }

    pub fn stage(&self) -> Milestone {
        self.milestones.current_stage()
    }
}

/// Input for creating a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJob {
    pub reference: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Explicit policy; the configured default for `priority` when absent.
    #[serde(default)]
    pub policy: Option<SlaPolicy>,
    /// Logged time; the engine clock when absent.
    #[serde(default)]
    pub logged_at: Option<Timestamp>,
}

impl NewJob {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_policy(mut self, policy: SlaPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn logged_at(mut self, at: Timestamp) -> Self {
        self.logged_at = Some(at);
        self
    }
}

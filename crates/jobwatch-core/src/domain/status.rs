//! Derived SLA status.
//!
//! `SlaStatus` is never ground truth: it is recomputed from milestones,
//! policy and the current time on every tick. The copy kept on a job record
//! is a display snapshot, used only to detect transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Timestamp;
use super::milestones::Milestone;

/// The lifecycle stage whose budget was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachStage {
    Acceptance,
    OnSiteArrival,
    Completion,
}

impl BreachStage {
    /// Human-readable stage name.
    pub fn label(self) -> &'static str {
        match self {
            BreachStage::Acceptance => "acceptance",
            BreachStage::OnSiteArrival => "on-site arrival",
            BreachStage::Completion => "completion",
        }
    }

    /// The milestone that ends this stage.
    pub fn awaited_milestone(self) -> Milestone {
        match self {
            BreachStage::Acceptance => Milestone::Accepted,
            BreachStage::OnSiteArrival => Milestone::OnSite,
            BreachStage::Completion => Milestone::Completed,
        }
    }
}

impl fmt::Display for BreachStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current SLA status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlaStatus {
    #[default]
    OnTrack,
    Breached {
        stage: BreachStage,
        /// Budget of the breached stage, in minutes.
        allowed_minutes: i64,
    },
}

impl SlaStatus {
    pub fn is_breached(&self) -> bool {
        matches!(self, SlaStatus::Breached { .. })
    }

    pub fn breached_stage(&self) -> Option<BreachStage> {
        match self {
            SlaStatus::OnTrack => None,
            SlaStatus::Breached { stage, .. } => Some(*stage),
        }
    }

    /// Reason text for a breach; `None` while on track.
    pub fn reason(&self) -> Option<String> {
        match self {
            SlaStatus::OnTrack => None,
            SlaStatus::Breached { stage, allowed_minutes } => Some(format!(
                "{} not reached within {} minutes",
                capitalize(stage.label()),
                allowed_minutes
            )),
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlaStatus::OnTrack => f.write_str("on_track"),
            SlaStatus::Breached { stage, .. } => write!(f, "breached ({stage})"),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Historical record of every breach a job went through.
///
/// Kept apart from the display status: a job that completes late shows
/// `on_track` but keeps its audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachAudit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_breached_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<BreachStage>,
}

impl BreachAudit {
    pub fn was_breached(&self) -> bool {
        !self.stages.is_empty()
    }

    /// Note a breach; each stage is kept once and the earliest time wins.
    pub fn note(&mut self, stage: BreachStage, at: Timestamp) {
        if self.first_breached_at.is_none_or(|first| at < first) {
            self.first_breached_at = Some(at);
        }
        if !self.stages.contains(&stage) {
            self.stages.push(stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn reason_mentions_stage_and_budget() {
        let status = SlaStatus::Breached {
            stage: BreachStage::OnSiteArrival,
            allowed_minutes: 60,
        };
        assert_eq!(
            status.reason().as_deref(),
            Some("On-site arrival not reached within 60 minutes")
        );
        assert_eq!(SlaStatus::OnTrack.reason(), None);
    }

    #[test]
    fn status_serializes_as_tagged_variant() {
        let status = SlaStatus::Breached {
            stage: BreachStage::Acceptance,
            allowed_minutes: 20,
        };
        let v = serde_json::to_value(status).unwrap();
        assert_eq!(v["state"], "breached");
        assert_eq!(v["stage"], "acceptance");

        let v = serde_json::to_value(SlaStatus::OnTrack).unwrap();
        assert_eq!(v["state"], "on_track");
    }

    #[test]
    fn audit_keeps_first_breach_and_unique_stages() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut audit = BreachAudit::default();
        assert!(!audit.was_breached());

        audit.note(BreachStage::Acceptance, t);
        audit.note(BreachStage::Acceptance, t + Duration::minutes(1));
        audit.note(BreachStage::Completion, t + Duration::minutes(5));

        assert!(audit.was_breached());
        assert_eq!(audit.first_breached_at, Some(t));
        assert_eq!(audit.stages, vec![BreachStage::Acceptance, BreachStage::Completion]);
    }

    #[test]
    fn audit_takes_an_earlier_breach_noted_later() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut audit = BreachAudit::default();

        audit.note(BreachStage::OnSiteArrival, t);
        audit.note(BreachStage::Acceptance, t - Duration::minutes(40));

        assert_eq!(audit.first_breached_at, Some(t - Duration::minutes(40)));
        assert_eq!(audit.stages, vec![BreachStage::OnSiteArrival, BreachStage::Acceptance]);
    }
}

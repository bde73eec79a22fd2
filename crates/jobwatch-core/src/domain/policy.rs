//! SLA policy: time budgets between milestones.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::milestones::Milestone;

/// Where the completion budget is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionAnchor {
    /// Completion is due `complete_within` after arrival on site.
    #[default]
    OnSite,
    /// Completion is due `complete_within` after the job was logged.
    Logged,
}

impl CompletionAnchor {
    pub fn milestone(self) -> Milestone {
        match self {
            CompletionAnchor::OnSite => Milestone::OnSite,
            CompletionAnchor::Logged => Milestone::Logged,
        }
    }
}

/// Job priority. Selects the default SLA policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Urgent, Priority::High, Priority::Normal, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "normal" | "medium" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(ValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// Time budgets (in minutes) for each lifecycle stage.
///
/// - `accept_within` is measured from `logged`
/// - `on_site_within` is measured from `accepted`
/// - `complete_within` is measured from `completion_anchor`
///
/// Values are signed so that a negative budget coming from an operator or a
/// config file can be reported instead of silently wrapping. `validate()` is
/// called at every write boundary; the evaluator assumes it passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub accept_within: i64,
    pub on_site_within: i64,
    pub complete_within: i64,
    #[serde(default)]
    pub completion_anchor: CompletionAnchor,
}

impl SlaPolicy {
    /// Build a policy and validate it.
    pub fn new(
        accept_within: i64,
        on_site_within: i64,
        complete_within: i64,
        completion_anchor: CompletionAnchor,
    ) -> Result<Self, ValidationError> {
        let policy = Self {
            accept_within,
            on_site_within,
            complete_within,
            completion_anchor,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Default policy for a priority.
    pub fn for_priority(priority: Priority) -> Self {
        let (on_site_within, complete_within) = match priority {
            Priority::Urgent => (60, 120),
            Priority::High => (60, 180),
            Priority::Normal => (90, 240),
            Priority::Low => (90, 240),
        };
        Self {
            accept_within: 20,
            on_site_within,
            complete_within,
            completion_anchor: CompletionAnchor::OnSite,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, minutes) in [
            ("accept_within", self.accept_within),
            ("on_site_within", self.on_site_within),
            ("complete_within", self.complete_within),
        ] {
            if minutes < 0 {
                return Err(ValidationError::NegativeDuration { field, minutes });
            }
            if Duration::try_minutes(minutes).is_none() {
                return Err(ValidationError::DurationOutOfRange { field, minutes });
            }
        }
        Ok(())
    }

    pub fn accept_budget(&self) -> Duration {
        budget(self.accept_within)
    }

    pub fn on_site_budget(&self) -> Duration {
        budget(self.on_site_within)
    }

    pub fn complete_budget(&self) -> Duration {
        budget(self.complete_within)
    }
}

/// Saturates instead of panicking, so an unvalidated policy read from
/// storage still evaluates.
fn budget(minutes: i64) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self::for_priority(Priority::default())
    }
}

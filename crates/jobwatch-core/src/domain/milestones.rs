//! Job lifecycle milestones.
//!
//! A milestone is a one-time fact: once recorded it is never unset. The
//! recorded timestamps always form a non-decreasing chain
//! `logged <= accepted <= on_site <= completed`, and a milestone can only be
//! recorded once its predecessor exists. Both rules are enforced here, at
//! the write boundary, so the evaluator can assume a valid chain.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Timestamp;
use super::errors::ValidationError;

/// Lifecycle milestone of a job, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Logged,
    Accepted,
    OnSite,
    Completed,
}

impl Milestone {
    pub const ALL: [Milestone; 4] = [
        Milestone::Logged,
        Milestone::Accepted,
        Milestone::OnSite,
        Milestone::Completed,
    ];

    /// The milestone that must already be recorded before this one.
    pub fn predecessor(self) -> Option<Milestone> {
        match self {
            Milestone::Logged => None,
            Milestone::Accepted => Some(Milestone::Logged),
            Milestone::OnSite => Some(Milestone::Accepted),
            Milestone::Completed => Some(Milestone::OnSite),
        }
    }

    pub fn successor(self) -> Option<Milestone> {
        match self {
            Milestone::Logged => Some(Milestone::Accepted),
            Milestone::Accepted => Some(Milestone::OnSite),
            Milestone::OnSite => Some(Milestone::Completed),
            Milestone::Completed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Milestone::Logged => "logged",
            Milestone::Accepted => "accepted",
            Milestone::OnSite => "on_site",
            Milestone::Completed => "completed",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Milestone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "logged" => Ok(Milestone::Logged),
            "accepted" => Ok(Milestone::Accepted),
            "on_site" | "onsite" => Ok(Milestone::OnSite),
            "completed" => Ok(Milestone::Completed),
            other => Err(ValidationError::UnknownMilestone(other.to_string())),
        }
    }
}

/// Recorded milestone timestamps of one job.
///
/// `logged` is set at creation. Optional fields missing from stored data
/// deserialize as "not reached yet".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMilestones {
    pub logged: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_site: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<Timestamp>,
}

impl JobMilestones {
    pub fn new(logged: Timestamp) -> Self {
        Self {
            logged,
            accepted: None,
            on_site: None,
            completed: None,
        }
    }

    pub fn get(&self, milestone: Milestone) -> Option<Timestamp> {
        match milestone {
            Milestone::Logged => Some(self.logged),
            Milestone::Accepted => self.accepted,
            Milestone::OnSite => self.on_site,
            Milestone::Completed => self.completed,
        }
    }

    fn slot(&mut self, milestone: Milestone) -> Option<&mut Option<Timestamp>> {
        match milestone {
            Milestone::Logged => None,
            Milestone::Accepted => Some(&mut self.accepted),
            Milestone::OnSite => Some(&mut self.on_site),
            Milestone::Completed => Some(&mut self.completed),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    /// Latest milestone reached so far.
    pub fn current_stage(&self) -> Milestone {
        Milestone::ALL
            .into_iter()
            .rev()
            .find(|m| self.get(*m).is_some())
            .unwrap_or(Milestone::Logged)
    }

    /// Record a milestone for the first time.
    pub fn record(&mut self, milestone: Milestone, at: Timestamp) -> Result<(), ValidationError> {
        if self.get(milestone).is_some() {
            return Err(ValidationError::MilestoneAlreadyRecorded(milestone));
        }
        if let Some(previous) = milestone.predecessor() {
            let Some(previous_at) = self.get(previous) else {
                return Err(ValidationError::MilestonePrerequisiteMissing {
                    milestone,
                    requires: previous,
                });
            };
            if at < previous_at {
                return Err(ValidationError::MilestoneOutOfOrder {
                    milestone,
                    at,
                    previous,
                    previous_at,
                });
            }
        }
        if let Some(slot) = self.slot(milestone) {
            *slot = Some(at);
        }
        Ok(())
    }

    /// Re-time an already recorded milestone, keeping the chain monotonic.
    ///
    /// Returns the replaced timestamp.
    pub fn correct(&mut self, milestone: Milestone, at: Timestamp) -> Result<Timestamp, ValidationError> {
        let Some(old) = self.get(milestone) else {
            return Err(ValidationError::MilestoneNotRecorded(milestone));
        };
        if let Some(previous) = milestone.predecessor() {
            if let Some(previous_at) = self.get(previous) {
                if at < previous_at {
                    return Err(ValidationError::MilestoneOutOfOrder {
                        milestone,
                        at,
                        previous,
                        previous_at,
                    });
                }
            }
        }
        if let Some(next) = milestone.successor() {
            if let Some(next_at) = self.get(next) {
                if next_at < at {
                    return Err(ValidationError::MilestoneOutOfOrder {
                        milestone: next,
                        at: next_at,
                        previous: milestone,
                        previous_at: at,
                    });
                }
            }
        }
        match self.slot(milestone) {
            Some(slot) => *slot = Some(at),
            None => self.logged = at,
        }
        Ok(old)
    }
}

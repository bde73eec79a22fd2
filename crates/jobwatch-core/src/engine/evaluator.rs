//! Status evaluator: `(policy, milestones, now) -> SlaStatus`.
//!
//! Pure and total for any chronologically valid input: no clock access, no
//! I/O, no errors. Stages are checked in lifecycle order and the first
//! breach wins, since a job cannot be in a later stage while an earlier one
//! is incomplete.

use chrono::Duration;

use crate::domain::{BreachStage, CompletionAnchor, JobMilestones, SlaPolicy, SlaStatus, Timestamp};

/// The stage currently running against a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub stage: BreachStage,
    pub anchor: Timestamp,
    pub budget: Duration,
}

impl ActiveWindow {
    /// Elapsed time since the anchor; never negative.
    pub fn elapsed(&self, now: Timestamp) -> Duration {
        now.signed_duration_since(self.anchor).max(Duration::zero())
    }

    pub fn is_exceeded(&self, now: Timestamp) -> bool {
        self.elapsed(now) > self.budget
    }

    /// End of the budget; `None` when it lies beyond the representable range.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.anchor.checked_add_signed(self.budget)
    }
}

/// Which budget applies given the recorded milestones.
///
/// `None` once the job is completed: completed jobs run against no budget.
pub fn active_window(policy: &SlaPolicy, milestones: &JobMilestones) -> Option<ActiveWindow> {
    if milestones.completed.is_some() {
        return None;
    }
    let window = match (milestones.accepted, milestones.on_site) {
        (None, None) => ActiveWindow {
            stage: BreachStage::Acceptance,
            anchor: milestones.logged,
            budget: policy.accept_budget(),
        },
        (Some(accepted), None) => ActiveWindow {
            stage: BreachStage::OnSiteArrival,
            anchor: accepted,
            budget: policy.on_site_budget(),
        },
        (_, Some(on_site)) => {
            let anchor = match policy.completion_anchor {
                CompletionAnchor::OnSite => on_site,
                CompletionAnchor::Logged => milestones.logged,
            };
            ActiveWindow {
                stage: BreachStage::Completion,
                anchor,
                budget: policy.complete_budget(),
            }
        }
    };
    Some(window)
}

/// Compute the current SLA status.
///
/// - completed jobs are `OnTrack` (terminal, no retroactive breach)
/// - otherwise the active stage is breached when strictly more than its
///   budget has elapsed since its anchor; a zero budget breaches as soon as
///   any time has passed, and a `now` before the anchor never breaches
pub fn evaluate(policy: &SlaPolicy, milestones: &JobMilestones, now: Timestamp) -> SlaStatus {
    match active_window(policy, milestones) {
        Some(window) if window.is_exceeded(now) => SlaStatus::Breached {
            stage: window.stage,
            allowed_minutes: window.budget.num_minutes(),
        },
        _ => SlaStatus::OnTrack,
    }
}

/// Stages that were closed by their milestone only after the budget ran
/// out, with the deadline each one missed.
///
/// This is history, not status: a completed job that was late everywhere
/// still evaluates `OnTrack`, but reports all three stages here.
pub fn overrun_stages(policy: &SlaPolicy, milestones: &JobMilestones) -> Vec<(BreachStage, Timestamp)> {
    let completion_anchor = match policy.completion_anchor {
        CompletionAnchor::OnSite => milestones.on_site,
        CompletionAnchor::Logged => Some(milestones.logged),
    };
    let stages = [
        (BreachStage::Acceptance, Some(milestones.logged), milestones.accepted, policy.accept_budget()),
        (BreachStage::OnSiteArrival, milestones.accepted, milestones.on_site, policy.on_site_budget()),
        (BreachStage::Completion, completion_anchor, milestones.completed, policy.complete_budget()),
    ];

    stages
        .into_iter()
        .filter_map(|(stage, anchor, closed_at, budget)| {
            let window = ActiveWindow {
                stage,
                anchor: anchor?,
                budget,
            };
            let closed_at = closed_at?;
            window
                .is_exceeded(closed_at)
                .then(|| (stage, window.deadline().unwrap_or(closed_at)))
        })
        .collect()
}

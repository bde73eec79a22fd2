//! Translation to legacy display labels.
//!
//! Only the UI boundary speaks in traffic lights and old stage names; the
//! engine itself works with `SlaStatus` and `Milestone`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::evaluator::{active_window, evaluate};
use crate::domain::{JobRecord, Milestone, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLight {
    Green,
    Amber,
    Red,
}

impl TrafficLight {
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficLight::Green => "green",
            TrafficLight::Amber => "amber",
            TrafficLight::Red => "red",
        }
    }
}

impl fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Traffic light for a job at `now`.
///
/// Red when breached, amber when on track but at least `amber_percent` of
/// the active stage's budget is used up, green otherwise. A zero budget has
/// no amber band.
pub fn traffic_light(job: &JobRecord, now: Timestamp, amber_percent: u8) -> TrafficLight {
    if evaluate(&job.policy, &job.milestones, now).is_breached() {
        return TrafficLight::Red;
    }
    let Some(window) = active_window(&job.policy, &job.milestones) else {
        return TrafficLight::Green;
    };
    let budget_secs = window.budget.num_seconds();
    if budget_secs <= 0 {
        return TrafficLight::Green;
    }
    let used_secs = window.elapsed(now).num_seconds();
    if used_secs * 100 >= budget_secs * i64::from(amber_percent) {
        TrafficLight::Amber
    } else {
        TrafficLight::Green
    }
}

/// Stage label used by the old job views.
pub fn legacy_stage_label(stage: Milestone) -> &'static str {
    match stage {
        Milestone::Logged => "new",
        Milestone::Accepted => "allocated",
        Milestone::OnSite => "on_site",
        Milestone::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompletionAnchor, JobId, Priority, SlaPolicy};
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;
    use ulid::Ulid;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn job(accept_within: i64) -> JobRecord {
        let policy = SlaPolicy::new(accept_within, 60, 120, CompletionAnchor::OnSite).unwrap();
        JobRecord::new(JobId::from_ulid(Ulid::new()), "JOB-1", Priority::High, policy, t0())
    }

    #[rstest]
    #[case::fresh(0, TrafficLight::Green)]
    #[case::below_threshold(14, TrafficLight::Green)]
    #[case::at_threshold(15, TrafficLight::Amber)]
    #[case::at_budget(20, TrafficLight::Amber)]
    #[case::breached(21, TrafficLight::Red)]
    fn light_follows_budget_usage(#[case] minutes: i64, #[case] expected: TrafficLight) {
        let light = traffic_light(&job(20), t0() + Duration::minutes(minutes), 75);
        assert_eq!(light, expected);
    }

    #[test]
    fn completed_job_is_green() {
        let mut job = job(20);
        job.milestones.record(Milestone::Accepted, t0() + Duration::hours(1)).unwrap();
        job.milestones.record(Milestone::OnSite, t0() + Duration::hours(3)).unwrap();
        job.milestones.record(Milestone::Completed, t0() + Duration::hours(9)).unwrap();

        assert_eq!(traffic_light(&job, t0() + Duration::days(3), 75), TrafficLight::Green);
    }

    #[test]
    fn zero_budget_has_no_amber_band() {
        let job = job(0);
        assert_eq!(traffic_light(&job, t0(), 75), TrafficLight::Green);
        assert_eq!(traffic_light(&job, t0() + Duration::seconds(1), 75), TrafficLight::Red);
    }

    #[test]
    fn legacy_labels() {
        assert_eq!(legacy_stage_label(Milestone::Logged), "new");
        assert_eq!(legacy_stage_label(Milestone::Accepted), "allocated");
        assert_eq!(TrafficLight::Amber.to_string(), "amber");
    }
}

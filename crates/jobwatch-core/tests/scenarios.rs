use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;

use jobwatch_core::domain::{
    BreachStage, CompletionAnchor, JobMilestones, Milestone, NewJob, NewReminder, NotificationKind, Priority,
    Reminder, ReminderState, SlaPolicy, SlaStatus, Timestamp,
};
use jobwatch_core::engine::{evaluate, sweep};
use jobwatch_core::impls::InMemoryStore;
use jobwatch_core::ports::{FixedClock, IdGenerator, UlidGenerator};
use jobwatch_core::{Engine, EngineBuilder};

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

fn minutes(m: i64) -> Timestamp {
    t0() + Duration::minutes(m)
}

fn policy() -> SlaPolicy {
    SlaPolicy::new(20, 60, 120, CompletionAnchor::OnSite).unwrap()
}

fn engine() -> (Engine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(t0()));
    let engine = EngineBuilder::new()
        .store(Arc::new(InMemoryStore::new()))
        .clock(clock.clone())
        .id_generator(Arc::new(UlidGenerator::new(clock.clone())))
        .build()
        .unwrap();
    (engine, clock)
}

#[test]
fn scenario_a_unaccepted_job_breaches_acceptance() {
    let milestones = JobMilestones::new(t0());
    let status = evaluate(&policy(), &milestones, minutes(21));
    assert_eq!(status.breached_stage(), Some(BreachStage::Acceptance));
}

#[rstest]
#[case::scenario_b(50, None)]
#[case::scenario_c(75, Some(BreachStage::OnSiteArrival))]
fn accepted_job_against_on_site_budget(#[case] now: i64, #[case] expected: Option<BreachStage>) {
    let mut milestones = JobMilestones::new(t0());
    milestones.record(Milestone::Accepted, minutes(10)).unwrap();

    let status = evaluate(&policy(), &milestones, minutes(now));
    assert_eq!(status.breached_stage(), expected);
}

#[test]
fn scenario_d_reminder_goes_overdue_once() {
    let ids = UlidGenerator::new(FixedClock::new(t0()));
    let reminder = Reminder::new(ids.generate_reminder_id(), "ring customer", t0(), t0());

    let first = sweep(&[reminder], minutes(1), &ids);
    assert_eq!(first.updated[0].status, ReminderState::Overdue);
    assert_eq!(first.notifications.len(), 1);

    let second = sweep(&first.updated, minutes(2), &ids);
    assert!(second.notifications.is_empty());
    assert!(second.updated.is_empty());
}

#[test]
fn evaluation_is_idempotent() {
    let mut milestones = JobMilestones::new(t0());
    milestones.record(Milestone::Accepted, minutes(5)).unwrap();

    for now in [0, 30, 70, 500] {
        assert_eq!(
            evaluate(&policy(), &milestones, minutes(now)),
            evaluate(&policy(), &milestones, minutes(now))
        );
    }
}

#[test]
fn breach_cannot_heal_by_waiting() {
    let milestones = JobMilestones::new(t0());
    assert!(evaluate(&policy(), &milestones, minutes(21)).is_breached());
    for later in [22, 60, 600, 60 * 24 * 30] {
        assert!(evaluate(&policy(), &milestones, minutes(later)).is_breached());
    }
}

#[tokio::test]
async fn one_notification_for_one_breach_over_many_ticks() {
    let (mut engine, clock) = engine();
    engine.create_job(NewJob::new("JOB-100").with_policy(policy())).await.unwrap();

    clock.set(minutes(21));
    engine.tick().await.unwrap();
    for _ in 0..3 {
        clock.advance(Duration::minutes(1));
        engine.tick().await.unwrap();
    }

    let breaches: Vec<_> = engine
        .notifications()
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind() == NotificationKind::SlaBreach)
        .collect();
    assert_eq!(breaches.len(), 1);
}

#[tokio::test]
async fn completed_job_stays_on_track_but_keeps_audit() {
    let (mut engine, clock) = engine();
    let job = engine
        .create_job(NewJob::new("JOB-101").with_priority(Priority::Urgent))
        .await
        .unwrap();

    clock.set(minutes(30));
    engine.tick().await.unwrap();
    for m in [Milestone::Accepted, Milestone::OnSite, Milestone::Completed] {
        engine.record_milestone(job.id, m, None).await.unwrap();
    }

    for days in [1, 7, 365] {
        clock.set(t0() + Duration::days(days));
        engine.tick().await.unwrap();
        let stored = &engine.jobs().await.unwrap()[0];
        assert_eq!(stored.status, SlaStatus::OnTrack);
        assert_eq!(stored.audit.stages, vec![BreachStage::Acceptance]);
    }
}

#[tokio::test]
async fn resumed_process_evaluates_against_current_time() {
    let (mut engine, clock) = engine();
    let job = engine.create_job(NewJob::new("JOB-102").with_policy(policy())).await.unwrap();
    engine.record_milestone(job.id, Milestone::Accepted, Some(minutes(5))).await.unwrap();

    // Suspended for three hours: one tick, one breach, of the stage that is
    // current now.
    clock.set(minutes(180));
    let report = engine.tick().await.unwrap();

    assert_eq!(report.notifications, 1);
    let stored = &engine.jobs().await.unwrap()[0];
    assert_eq!(stored.status.breached_stage(), Some(BreachStage::OnSiteArrival));
}

#[tokio::test]
async fn reminders_and_jobs_are_evaluated_independently() {
    let (mut engine, clock) = engine();
    engine.create_job(NewJob::new("JOB-103").with_policy(policy())).await.unwrap();
    engine.add_reminder(NewReminder::new("order parts", minutes(5))).await.unwrap();

    clock.set(minutes(10));
    let report = engine.tick().await.unwrap();
    assert_eq!(report.breaches, 0);
    assert_eq!(report.reminders_overdue, 1);

    clock.set(minutes(25));
    let report = engine.tick().await.unwrap();
    assert_eq!(report.breaches, 1);
    assert_eq!(report.reminders_overdue, 0);
    assert_eq!(engine.notifications().await.unwrap().len(), 2);
}

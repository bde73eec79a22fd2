//! Reminder scheduler: one sweep over all reminders at a given time.
//!
//! Two-step design: a snoozed reminder whose snooze ran out only goes back
//! to `Active` in this pass. Whether it is overdue is decided by the next
//! sweep, so no reminder changes state twice within one pass.

use crate::domain::{EntityRef, Notification, NotificationKind, Reminder, ReminderState, Timestamp};
use crate::ports::IdGenerator;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOutcome {
    /// Reminders whose state changed (only these need to be written back).
    pub updated: Vec<Reminder>,
    pub notifications: Vec<Notification>,
}

impl SweepOutcome {
    pub fn overdue_count(&self) -> usize {
        self.updated
            .iter()
            .filter(|r| r.status == ReminderState::Overdue)
            .count()
    }

    pub fn woken_count(&self) -> usize {
        self.updated
            .iter()
            .filter(|r| r.status == ReminderState::Active)
            .count()
    }
}

pub fn sweep(reminders: &[Reminder], now: Timestamp, ids: &dyn IdGenerator) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    for reminder in reminders {
        match reminder.status {
            ReminderState::Active if reminder.is_due(now) => {
                let mut updated = reminder.clone();
                updated.mark_overdue();
                outcome.notifications.push(Notification::new(
                    ids.generate_notification_id(),
                    NotificationKind::ReminderOverdue,
                    format!("Reminder overdue: {}", reminder.title),
                    now,
                    Some(EntityRef::Reminder(reminder.id)),
                ));
                outcome.updated.push(updated);
            }
            ReminderState::Snoozed if reminder.snooze_expired(now) => {
                let mut updated = reminder.clone();
                updated.wake();
                outcome.updated.push(updated);
            }
            // Overdue and Completed are left alone; Completed is terminal.
            _ => {}
        }
    }

    outcome
}

//! Domain model (ids, milestones, policy, status, reminders, notifications).

pub mod errors;
pub mod ids;
pub mod job;
pub mod milestones;
pub mod notification;
pub mod policy;
pub mod reminder;
pub mod status;
pub mod timeline;

/// Timestamp type used throughout the engine.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub use self::errors::ValidationError;
pub use self::ids::{JobId, NotificationId, ReminderId, TimelineEntryId};
pub use self::job::{JobRecord, NewJob};
pub use self::milestones::{JobMilestones, Milestone};
pub use self::notification::{EntityRef, Notification, NotificationKind};
pub use self::policy::{CompletionAnchor, Priority, SlaPolicy};
pub use self::reminder::{NewReminder, Reminder, ReminderState};
pub use self::status::{BreachAudit, BreachStage, SlaStatus};
pub use self::timeline::{Severity, TimelineEntry, TimelineKind};

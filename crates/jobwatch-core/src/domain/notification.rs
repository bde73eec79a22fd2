//! User-facing notifications.
//!
//! Notifications are append-only. They are created only as a side effect of
//! a status or reminder transition, and the only mutation a consumer may
//! make afterwards is flipping `read`.

use serde::{Deserialize, Serialize};

use super::Timestamp;
use super::ids::{JobId, NotificationId, ReminderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SlaBreach,
    ReminderOverdue,
}

/// The entity a notification (or timeline entry) is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Job(JobId),
    Reminder(ReminderId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    kind: NotificationKind,
    message: String,
    timestamp: Timestamp,
    #[serde(default)]
    read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    related: Option<EntityRef>,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        kind: NotificationKind,
        message: impl Into<String>,
        timestamp: Timestamp,
        related: Option<EntityRef>,
    ) -> Self {
        Self {
            id,
            kind,
            message: message.into(),
            timestamp,
            read: false,
            related,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn related(&self) -> Option<EntityRef> {
        self.related
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ulid::Ulid;

    #[test]
    fn new_notification_is_unread_and_only_read_flag_changes() {
        let job = JobId::from_ulid(Ulid::new());
        let mut n = Notification::new(
            NotificationId::from_ulid(Ulid::new()),
            NotificationKind::SlaBreach,
            "JOB-1 breached acceptance",
            Utc::now(),
            Some(EntityRef::Job(job)),
        );
        let before = n.clone();
        assert!(!n.is_read());

        n.mark_read();

        assert!(n.is_read());
        assert_eq!(n.message(), before.message());
        assert_eq!(n.timestamp(), before.timestamp());
        assert_eq!(n.kind(), before.kind());
    }

    #[test]
    fn entity_ref_is_tagged() {
        let ulid = Ulid::new();
        let v = serde_json::to_value(EntityRef::Reminder(ReminderId::from_ulid(ulid))).unwrap();
        assert_eq!(v["kind"], "reminder");
        assert_eq!(v["id"], ulid.to_string());
    }
}

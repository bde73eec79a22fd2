//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID
//!
//! Every identifier is a ULID: 48 bits of millisecond timestamp followed by
//! 80 random bits.
//! - **Sortable by time**: ids from different milliseconds order by creation.
//! - **Not sequential**: ids from the same millisecond order randomly, so
//!   nothing may rely on id order to break ties inside one tick.
//! - **Coordination-free**: any process can mint them.
//!
//! # Phantom types
//!
//! The ULID is wrapped in `Id<T>`, where `T` is an uninhabited marker. A
//! `JobId` can never be passed where a `ReminderId` is expected, while the
//! formatting, parsing and serde code is written once.
//!
//! # Text form
//!
//! Display is `<prefix><ulid>` (e.g. `job-01HV...`). Parsing accepts the
//! prefixed form and the bare ULID. Serde uses the bare ULID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// Marker trait for each id kind.
pub trait IdMarker: Send + Sync + 'static {
    /// Prefix used by `Display` (e.g. "job-").
    fn prefix() -> &'static str;
}

/// Generic ULID-backed identifier.
#[repr(transparent)]
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

// Manual impls: derives would put bounds on `T`, and the marker types are
// uninhabited enums that carry no data.
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ok(Self::from_ulid(raw.parse()?))
    }
}

// ========================================
// Marker types
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn prefix() -> &'static str {
        "job-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reminder {}

impl IdMarker for Reminder {
    fn prefix() -> &'static str {
        "rem-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Notification {}

impl IdMarker for Notification {
    fn prefix() -> &'static str {
        "ntf-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimelineEntry {}

impl IdMarker for TimelineEntry {
    fn prefix() -> &'static str {
        "tl-"
    }
}

// ========================================
// Type aliases
// ========================================

/// Identifier of a tracked job.
pub type JobId = Id<Job>;

/// Identifier of a reminder.
pub type ReminderId = Id<Reminder>;

/// Identifier of a user-facing notification.
pub type NotificationId = Id<Notification>;

/// Identifier of a job timeline (audit) entry.
pub type TimelineEntryId = Id<TimelineEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid = Ulid::new();

        let job = JobId::from_ulid(ulid);
        let reminder = ReminderId::from_ulid(ulid);

        assert_eq!(job.as_ulid(), reminder.as_ulid());
        assert!(job.to_string().starts_with("job-"));
        assert!(reminder.to_string().starts_with("rem-"));

        // let _: JobId = reminder; // <- does not compile
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = JobId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = JobId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn ids_serialize_as_bare_ulid() {
        let job_id = JobId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&job_id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", job_id.as_ulid()));

        let deserialized: JobId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(job_id, deserialized);
    }

    #[test]
    fn parse_accepts_prefixed_and_bare_forms() {
        let ulid = Ulid::new();
        let prefixed: NotificationId = format!("ntf-{ulid}").parse().unwrap();
        let bare: NotificationId = ulid.to_string().parse().unwrap();

        assert_eq!(prefixed, bare);
        assert!("ntf-not-a-ulid".parse::<NotificationId>().is_err());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<JobId>(), size_of::<Ulid>());
        assert_eq!(size_of::<TimelineEntryId>(), 16);
    }
}

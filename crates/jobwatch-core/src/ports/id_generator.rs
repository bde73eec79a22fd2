//! IdGenerator port.
//!
//! # Timestamps
//!
//! `UlidGenerator` takes the timestamp part of each ULID from its `Clock`,
//! not from the system time. Ids minted in one tick share a millisecond and
//! sort together, and under a `FixedClock` every id carries the fixed time.
//!
//! # Randomness
//!
//! The remaining 80 bits come from `rand::random`. Two ids from the same
//! millisecond are distinct but their relative order is arbitrary.

use ulid::Ulid;

use crate::domain::{JobId, NotificationId, ReminderId, TimelineEntryId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_job_id(&self) -> JobId;

    fn generate_reminder_id(&self) -> ReminderId;

    fn generate_notification_id(&self) -> NotificationId;

    fn generate_timeline_id(&self) -> TimelineEntryId;
}

/// ULID generator whose timestamp part comes from `C`.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        // Pre-epoch clocks clamp to zero rather than wrapping.
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_job_id(&self) -> JobId {
        JobId::from(self.next_ulid())
    }

    fn generate_reminder_id(&self) -> ReminderId {
        ReminderId::from(self.next_ulid())
    }

    fn generate_notification_id(&self) -> NotificationId {
        NotificationId::from(self.next_ulid())
    }

    fn generate_timeline_id(&self) -> TimelineEntryId {
        TimelineEntryId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_job_id();
        let id2 = id_gen.generate_job_id();
        let id3 = id_gen.generate_job_id();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_notification_id();
        let id2 = id_gen.generate_notification_id();

        // Random part still differs.
        assert_ne!(id1, id2);

        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn each_id_kind_has_its_prefix() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert!(id_gen.generate_job_id().to_string().starts_with("job-"));
        assert!(id_gen.generate_reminder_id().to_string().starts_with("rem-"));
        assert!(id_gen.generate_notification_id().to_string().starts_with("ntf-"));
        assert!(id_gen.generate_timeline_id().to_string().starts_with("tl-"));
    }
}

//! Clock port.
//!
//! Every time-dependent decision in the engine reads `now` from a `Clock`,
//! so tests can pin or step time without sleeping.

use std::sync::RwLock;

use chrono::{Duration, Utc};

use crate::domain::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_can_be_stepped() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::minutes(21));
        assert_eq!(clock.now(), t0 + Duration::minutes(21));

        // Going backwards is allowed; the evaluator clamps elapsed time.
        clock.set(t0 - Duration::hours(1));
        assert_eq!(clock.now(), t0 - Duration::hours(1));
    }

    #[test]
    fn shared_clock_sees_updates() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = std::sync::Arc::new(FixedClock::new(t0));
        let shared: std::sync::Arc<FixedClock> = clock.clone();

        clock.advance(Duration::seconds(5));
        assert_eq!(shared.now(), t0 + Duration::seconds(5));
    }
}

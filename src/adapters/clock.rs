//! Clock adapters.
//!
//! `SystemClock` reads the wall clock. `ManualClock` is set and advanced by
//! tests and local simulations so hold expiry can be exercised without
//! sleeping.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Controllable time source.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Clock fixed at a UTC instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::new(Timestamp::from_datetime(instant))
    }

    pub fn set(&self, instant: Timestamp) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = now.plus_minutes(minutes);
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = now.plus_secs(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_only_moves_when_told() {
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2025, 1, 10, 4, 0, 0).unwrap());
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance_minutes(5);
        assert_eq!(clock.now(), start.plus_minutes(5));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(!clock.now().is_before(&first));
    }
}

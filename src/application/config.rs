//! Engine policy.
//!
//! Pure values the handlers need at runtime: the slot grid, the hold window,
//! the consultation fee, and the reconciliation thresholds. Built from
//! `AppConfig::engine_config()` in production and directly in tests.

use chrono::{Duration, FixedOffset, Offset, Utc};

use crate::domain::appointment::SlotGrid;
use crate::domain::foundation::Money;

/// Runtime policy shared by every handler.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bookable slots of a clinic day.
    pub grid: SlotGrid,

    /// Amount charged for an appointment.
    pub consultation_fee: Money,

    /// Minutes an unpaid booking keeps its slot.
    pub hold_minutes: i64,

    /// Offset used to turn instants into clinic-local dates and times.
    pub utc_offset: FixedOffset,

    /// Initiated payments younger than this are not reconciled.
    pub reconcile_grace: Duration,

    /// Orders still open after this long are failed.
    pub order_timeout: Duration,

    /// Maximum records handled per sweep.
    pub batch_size: u32,
}

impl EngineConfig {
    /// Config with default policy around the given grid and fee.
    pub fn new(grid: SlotGrid, consultation_fee: Money) -> Self {
        Self {
            grid,
            consultation_fee,
            hold_minutes: 15,
            utc_offset: Utc.fix(),
            reconcile_grace: Duration::minutes(15),
            order_timeout: Duration::hours(1),
            batch_size: 100,
        }
    }

    pub fn with_hold_minutes(mut self, minutes: i64) -> Self {
        self.hold_minutes = minutes;
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_reconcile_grace(mut self, grace: Duration) -> Self {
        self.reconcile_grace = grace;
        self
    }

    pub fn with_order_timeout(mut self, timeout: Duration) -> Self {
        self.order_timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::appointment::TimeSlot;

    fn grid() -> SlotGrid {
        SlotGrid::new(
            TimeSlot::from_hm(9, 0).unwrap(),
            TimeSlot::from_hm(12, 0).unwrap(),
            30,
        )
        .unwrap()
    }

    #[test]
    fn defaults_match_documented_policy() {
        let config = EngineConfig::new(grid(), Money::new(50_000, "INR").unwrap());
        assert_eq!(config.hold_minutes, 15);
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.order_timeout, Duration::hours(1));
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = EngineConfig::new(grid(), Money::new(100, "INR").unwrap())
            .with_hold_minutes(5)
            .with_batch_size(10);
        assert_eq!(config.hold_minutes, 5);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.reconcile_grace, Duration::minutes(15));
    }
}

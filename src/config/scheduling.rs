//! Scheduling configuration
//!
//! The clinic day (opening hours and slot width), the unpaid hold window,
//! the consultation fee, and the background sweep cadence.

use chrono::FixedOffset;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::appointment::{SlotGrid, TimeSlot};

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    /// Minutes an unpaid booking holds its slot
    #[serde(default = "default_hold_minutes")]
    pub hold_minutes: i64,

    /// First slot start, `HH:MM` local time
    #[serde(default = "default_opening_time")]
    pub opening_time: String,

    /// End of the last slot, `HH:MM` local time
    #[serde(default = "default_closing_time")]
    pub closing_time: String,

    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,

    /// Consultation fee in minor units of the gateway currency
    #[serde(default = "default_consultation_fee")]
    pub consultation_fee_minor: i64,

    /// Clinic offset from UTC in minutes (IST is 330)
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,

    /// Seconds between expiry/reconciliation sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum records handled per sweep
    #[serde(default = "default_sweep_batch")]
    pub sweep_batch_size: u32,
}

impl SchedulingConfig {
    /// Builds the slot grid from opening hours and slot width.
    pub fn slot_grid(&self) -> Result<SlotGrid, ValidationError> {
        let parse = |label: &str| {
            label
                .parse::<TimeSlot>()
                .map_err(|e| ValidationError::InvalidScheduling(e.to_string()))
        };
        SlotGrid::new(
            parse(&self.opening_time)?,
            parse(&self.closing_time)?,
            self.slot_minutes,
        )
        .map_err(|e| ValidationError::InvalidScheduling(e.to_string()))
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ValidationError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ValidationError::InvalidScheduling(format!(
                "utc_offset_minutes {} out of range",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate scheduling configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=24 * 60).contains(&self.hold_minutes) {
            return Err(ValidationError::InvalidScheduling(
                "hold_minutes must be between 1 and 1440".to_string(),
            ));
        }
        if self.consultation_fee_minor <= 0 {
            return Err(ValidationError::InvalidScheduling(
                "consultation_fee_minor must be positive".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 || self.sweep_batch_size == 0 {
            return Err(ValidationError::InvalidScheduling(
                "sweep interval and batch size must be positive".to_string(),
            ));
        }
        self.slot_grid()?;
        self.utc_offset()?;
        Ok(())
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            hold_minutes: default_hold_minutes(),
            opening_time: default_opening_time(),
            closing_time: default_closing_time(),
            slot_minutes: default_slot_minutes(),
            consultation_fee_minor: default_consultation_fee(),
            utc_offset_minutes: default_utc_offset(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch(),
        }
    }
}

fn default_hold_minutes() -> i64 {
    15
}

fn default_opening_time() -> String {
    "09:00".to_string()
}

fn default_closing_time() -> String {
    "17:00".to_string()
}

fn default_slot_minutes() -> u32 {
    30
}

fn default_consultation_fee() -> i64 {
    50_000
}

fn default_utc_offset() -> i32 {
    330
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_sweep_batch() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slot_grid().unwrap().slots().len(), 16);
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 330 * 60);
    }

    #[test]
    fn test_bad_opening_time_rejected() {
        let config = SchedulingConfig {
            opening_time: "9am".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidScheduling(_))
        ));
    }

    #[test]
    fn test_zero_hold_rejected() {
        let config = SchedulingConfig {
            hold_minutes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        let config = SchedulingConfig {
            utc_offset_minutes: 24 * 60,
            ..Default::default()
        };
        assert!(config.utc_offset().is_err());
    }
}

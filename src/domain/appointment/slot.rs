//! Slot value objects.
//!
//! A slot is a fixed-width interval on a doctor's day, labelled by its start
//! time in `HH:MM` form. The [`SlotGrid`] defines which labels are bookable.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DoctorId, ValidationError};

/// Start time of a bookable slot, always on a whole minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    /// Builds a slot from hour and minute.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::invalid_format("time_slot", "hour or minute out of range"))
    }

    /// Wall-clock start of the slot.
    pub fn start(&self) -> NaiveTime {
        self.0
    }

    /// Minutes since midnight.
    pub fn minute_of_day(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl FromStr for TimeSlot {
    type Err = ValidationError;

    /// Parses a strict `HH:MM` label (24-hour clock, zero padded).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || b.is_ascii_digit());
        if !well_formed {
            return Err(ValidationError::invalid_format(
                "time_slot",
                format!("expected HH:MM, got '{}'", s),
            ));
        }
        let hour: u32 = s[0..2].parse().map_err(|_| {
            ValidationError::invalid_format("time_slot", "hour is not a number")
        })?;
        let minute: u32 = s[3..5].parse().map_err(|_| {
            ValidationError::invalid_format("time_slot", "minute is not a number")
        })?;
        Self::from_hm(hour, minute)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// The bookable slots of a doctor's day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    opens: TimeSlot,
    closes: TimeSlot,
    width_minutes: u32,
}

impl SlotGrid {
    /// Creates a grid; the last slot must end at or before `closes`.
    pub fn new(opens: TimeSlot, closes: TimeSlot, width_minutes: u32) -> Result<Self, ValidationError> {
        if width_minutes == 0 || width_minutes > 240 {
            return Err(ValidationError::out_of_range(
                "slot_minutes",
                1,
                240,
                i64::from(width_minutes),
            ));
        }
        if closes.minute_of_day() < opens.minute_of_day() + width_minutes {
            return Err(ValidationError::invalid_format(
                "slot_grid",
                "closing time leaves no room for a single slot",
            ));
        }
        Ok(Self {
            opens,
            closes,
            width_minutes,
        })
    }

    /// Width of every slot in minutes.
    pub fn width_minutes(&self) -> u32 {
        self.width_minutes
    }

    /// Every slot of the day, in chronological order.
    pub fn slots(&self) -> Vec<TimeSlot> {
        let mut slots = Vec::new();
        let mut minute = self.opens.minute_of_day();
        while minute + self.width_minutes <= self.closes.minute_of_day() {
            if let Ok(slot) = TimeSlot::from_hm(minute / 60, minute % 60) {
                slots.push(slot);
            }
            minute += self.width_minutes;
        }
        slots
    }

    /// True if `slot` starts on a grid boundary inside opening hours.
    pub fn contains(&self, slot: &TimeSlot) -> bool {
        let minute = slot.minute_of_day();
        let opens = self.opens.minute_of_day();
        minute >= opens
            && minute + self.width_minutes <= self.closes.minute_of_day()
            && (minute - opens) % self.width_minutes == 0
    }
}

/// Ledger key: one doctor, one day, one slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
}

impl SlotKey {
    pub fn new(doctor_id: DoctorId, date: NaiveDate, time_slot: TimeSlot) -> Self {
        Self {
            doctor_id,
            date,
            time_slot,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.doctor_id, self.date, self.time_slot)
    }
}

/// One row of the availability listing shown to patients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub available: bool,
}

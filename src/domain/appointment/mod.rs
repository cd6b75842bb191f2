//! Appointment module - doctor slots and the booking lifecycle.

mod aggregate;
mod events;
mod slot;
mod status;

pub use aggregate::Appointment;
pub use events::AppointmentEvent;
pub use slot::{SlotAvailability, SlotGrid, SlotKey, TimeSlot};
pub use status::{AppointmentStatus, CancellationReason};

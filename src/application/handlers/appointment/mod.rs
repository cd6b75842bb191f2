//! Appointment handlers.
//!
//! ## Commands
//! - Booking a slot
//! - Cancelling a pending appointment
//! - Sweeping holds that were never paid
//!
//! ## Queries
//! - Slot availability for a doctor's day
//! - A single appointment

mod book_appointment;
mod cancel_appointment;
mod expire_stale_holds;
mod get_appointment;
mod list_available_slots;

// Commands
pub use book_appointment::{BookAppointmentCommand, BookAppointmentHandler, BookAppointmentResult};
pub use cancel_appointment::{CancelAppointmentCommand, CancelAppointmentHandler};
pub use expire_stale_holds::{ExpireStaleHoldsHandler, HoldSweepReport};

// Queries
pub use get_appointment::{GetAppointmentHandler, GetAppointmentQuery};
pub use list_available_slots::{
    ListAvailableSlotsHandler, ListAvailableSlotsQuery, ListAvailableSlotsResult,
};

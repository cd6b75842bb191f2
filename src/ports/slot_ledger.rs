//! Slot ledger port - exclusive holds on doctor slots.
//!
//! The ledger is the authority on whether a slot is taken. `try_reserve` is
//! atomic per key; `reserved_slots` is a best-effort read for listings.
//!
//! Holds are written separately from appointments, so a crash or a failed
//! release can leave a hold whose appointment is gone or finished.
//! `held_reservations` lets the hold sweep find and free those.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::appointment::{SlotKey, TimeSlot};
use crate::domain::foundation::{AppointmentId, DoctorId, DomainError, Timestamp};

/// Proof of a successful hold, needed to release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub key: SlotKey,
    pub holder: AppointmentId,
}

/// Result of a reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Reservation),
    Busy,
}

#[async_trait]
pub trait SlotLedger: Send + Sync {
    /// Atomically claims `key` for `holder`.
    ///
    /// Returns `Busy` if any other holder already has it.
    async fn try_reserve(
        &self,
        key: &SlotKey,
        holder: AppointmentId,
        reserved_at: Timestamp,
    ) -> Result<ReserveOutcome, DomainError>;

    /// Frees the slot if it is still held by the reservation's holder.
    ///
    /// Releasing a slot that is free or held by someone else is a no-op.
    async fn release(&self, reservation: &Reservation) -> Result<(), DomainError>;

    /// Slots currently held for a doctor on a day.
    async fn reserved_slots(
        &self,
        doctor_id: &DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, DomainError>;

    /// Holds for `from` or later days taken at or before `reserved_by`.
    async fn held_reservations(
        &self,
        from: NaiveDate,
        reserved_by: Timestamp,
    ) -> Result<Vec<Reservation>, DomainError>;
}

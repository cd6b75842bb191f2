//! Appointment aggregate.
//!
//! An appointment is a patient's claim on one doctor slot. It is created
//! `Pending` with the slot already reserved, becomes `Confirmed` only through
//! a successful payment that references it, and otherwise ends `Cancelled`
//! or `Expired`.
//!
//! # Design Decisions
//!
//! - **Time is injected**: every mutator takes `now` from the clock port
//! - **Terminal is final**: confirmed and cancelled records are never edited
//! - **Latest attempt wins**: only the most recently attached payment can
//!   confirm the appointment

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, DoctorId, DomainError, ErrorCode, PatientId, PaymentId, StateMachine, Timestamp,
};

use super::{AppointmentStatus, CancellationReason, SlotKey, TimeSlot};

/// Appointment aggregate.
///
/// # Invariants
///
/// - only the attached `payment_id` can confirm the appointment
/// - `cancelled_at` and `cancellation_reason` are set exactly when status is `Cancelled`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub status: AppointmentStatus,

    /// Payment attempt attached by `initiate_payment`.
    pub payment_id: Option<PaymentId>,

    pub cancellation_reason: Option<CancellationReason>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
}

impl Appointment {
    /// Creates a pending appointment for an already reserved slot.
    pub fn book(
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time_slot: TimeSlot,
        now: Timestamp,
    ) -> Self {
        Self {
            id: AppointmentId::new(),
            patient_id,
            doctor_id,
            date,
            time_slot,
            status: AppointmentStatus::Pending,
            payment_id: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    /// Ledger key of the slot this appointment occupies.
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id.clone(), self.date, self.time_slot)
    }

    /// Instant the visit starts, given the clinic's UTC offset.
    pub fn starts_at(&self, offset: FixedOffset) -> Timestamp {
        Timestamp::from_local(self.date, self.time_slot.start(), offset)
    }

    /// When an unpaid hold lapses.
    pub fn hold_expires_at(&self, hold_minutes: i64) -> Timestamp {
        self.created_at.plus_minutes(hold_minutes)
    }

    /// True if still unpaid after the hold window.
    pub fn is_hold_expired(&self, now: Timestamp, hold_minutes: i64) -> bool {
        self.status == AppointmentStatus::Pending && !now.is_before(&self.hold_expires_at(hold_minutes))
    }

    /// Records the payment attempt that will settle this appointment.
    ///
    /// A later attempt replaces an earlier one; the payment store guarantees
    /// the earlier attempt is no longer active by then.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the appointment is not pending.
    pub fn attach_payment(&mut self, payment_id: PaymentId, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_pending("attach a payment to")?;
        if self.payment_id != Some(payment_id) {
            self.payment_id = Some(payment_id);
            self.updated_at = now;
        }
        Ok(())
    }

    /// Confirms the appointment after the referenced payment succeeded.
    ///
    /// # Errors
    ///
    /// `InvalidState` if not pending or if `payment_id` is not the attached payment.
    pub fn confirm(&mut self, payment_id: PaymentId, now: Timestamp) -> Result<(), DomainError> {
        if self.payment_id.is_some_and(|attached| attached != payment_id) {
            return Err(DomainError::new(
                ErrorCode::InvalidState,
                format!(
                    "Payment {} does not belong to appointment {}",
                    payment_id, self.id
                ),
            ));
        }
        self.transition_to(AppointmentStatus::Confirmed)?;
        self.payment_id = Some(payment_id);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels a pending appointment.
    pub fn cancel(&mut self, reason: CancellationReason, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(AppointmentStatus::Cancelled)?;
        self.cancellation_reason = Some(reason);
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Marks a pending appointment whose visit time has passed.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(AppointmentStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self, action: &str) -> Result<(), DomainError> {
        if self.status == AppointmentStatus::Pending {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidState,
                format!("Cannot {} a {} appointment", action, self.status),
            ))
        }
    }

    fn transition_to(&mut self, target: AppointmentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|err| {
            DomainError::new(
                ErrorCode::InvalidState,
                format!("Appointment {}: {}", self.id, err),
            )
            .with_detail("status", self.status.as_str())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booked_at(now: Timestamp) -> Appointment {
        Appointment::book(
            PatientId::new("P-1").unwrap(),
            DoctorId::new("D101").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "10:00".parse().unwrap(),
            now,
        )
    }

    #[test]
    fn booking_starts_pending_without_payment() {
        let appt = booked_at(Timestamp::now());
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert!(appt.payment_id.is_none());
        assert_eq!(appt.slot_key().to_string(), "D101/2025-01-10/10:00");
    }

    #[test]
    fn confirm_requires_the_attached_payment() {
        let now = Timestamp::now();
        let mut appt = booked_at(now);
        let attached = PaymentId::new();
        appt.attach_payment(attached, now).unwrap();

        let err = appt.confirm(PaymentId::new(), now).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert_eq!(appt.status, AppointmentStatus::Pending);

        appt.confirm(attached, now).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn a_new_attempt_replaces_the_attached_payment() {
        let now = Timestamp::now();
        let mut appt = booked_at(now);
        let first = PaymentId::new();
        let second = PaymentId::new();
        appt.attach_payment(first, now).unwrap();
        appt.attach_payment(first, now).unwrap();
        appt.attach_payment(second, now).unwrap();
        assert_eq!(appt.payment_id, Some(second));
        assert!(appt.confirm(first, now).is_err());
    }

    #[test]
    fn confirmed_appointment_cannot_be_cancelled() {
        let now = Timestamp::now();
        let mut appt = booked_at(now);
        appt.confirm(PaymentId::new(), now).unwrap();

        let err = appt.cancel(CancellationReason::PatientRequest, now).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(appt.cancelled_at.is_none());
    }

    #[test]
    fn cancel_records_reason_and_time() {
        let now = Timestamp::now();
        let mut appt = booked_at(now);
        appt.cancel(CancellationReason::HoldExpired, now).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
        assert_eq!(appt.cancellation_reason, Some(CancellationReason::HoldExpired));
        assert_eq!(appt.cancelled_at, Some(now));
    }

    #[test]
    fn hold_expiry_is_inclusive_of_the_deadline() {
        let created = Timestamp::now();
        let appt = booked_at(created);
        assert!(!appt.is_hold_expired(created.plus_minutes(4), 5));
        assert!(appt.is_hold_expired(created.plus_minutes(5), 5));
    }

    #[test]
    fn attach_payment_rejected_once_cancelled() {
        let now = Timestamp::now();
        let mut appt = booked_at(now);
        appt.cancel(CancellationReason::PatientRequest, now).unwrap();
        assert!(appt.attach_payment(PaymentId::new(), now).is_err());
    }
}

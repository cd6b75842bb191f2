//! BookAppointmentHandler - Claims a doctor slot and creates a pending appointment.
//!
//! The only entry point that creates appointments. The slot ledger decides
//! who gets a contested slot; the loser sees `SlotUnavailable`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::application::context::VisitContext;
use crate::domain::appointment::{Appointment, AppointmentEvent, TimeSlot};
use crate::domain::foundation::{DoctorId, PatientId, Timestamp};
use crate::domain::VisitError;
use crate::ports::ReserveOutcome;

/// Command to book a slot.
#[derive(Debug, Clone)]
pub struct BookAppointmentCommand {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    /// Raw `HH:MM` label as sent by the client.
    pub time_slot: String,
}

/// Result of a successful booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookAppointmentResult {
    pub appointment: Appointment,
    /// Pay before this instant or the slot is released.
    pub hold_expires_at: Timestamp,
}

pub struct BookAppointmentHandler {
    ctx: Arc<VisitContext>,
}

impl BookAppointmentHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: BookAppointmentCommand,
    ) -> Result<BookAppointmentResult, VisitError> {
        let config = &self.ctx.config;

        // 1. Validate the slot label and the day
        let slot: TimeSlot = cmd.time_slot.parse()?;
        if !config.grid.contains(&slot) {
            return Err(VisitError::validation(
                "time_slot",
                format!("{} is not a bookable slot", slot),
            ));
        }
        let now = self.ctx.now();
        if cmd.date < self.ctx.today(now) {
            return Err(VisitError::validation("date", "date is in the past"));
        }

        // 2. A slot that already started today cannot be held
        let appointment = Appointment::book(cmd.patient_id, cmd.doctor_id, cmd.date, slot, now);
        let key = appointment.slot_key();
        if !now.is_before(&appointment.starts_at(config.utc_offset)) {
            return Err(VisitError::slot_unavailable(&key));
        }

        // 3. Claim the slot
        let reservation = match self.ctx.ledger.try_reserve(&key, appointment.id, now).await? {
            ReserveOutcome::Reserved(reservation) => reservation,
            ReserveOutcome::Busy => {
                tracing::debug!(slot = %key, "Slot already held");
                return Err(VisitError::slot_unavailable(&key));
            }
        };

        // 4. Persist, giving the slot back if the write fails
        if let Err(e) = self.ctx.appointments.save(&appointment).await {
            if let Err(release_err) = self.ctx.ledger.release(&reservation).await {
                tracing::error!(
                    slot = %key,
                    error = %release_err,
                    "Failed to release slot after aborted booking"
                );
            }
            return Err(e.into());
        }

        let hold_expires_at = appointment.hold_expires_at(config.hold_minutes);
        tracing::info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            slot = %key,
            hold_expires_at = %hold_expires_at.as_datetime(),
            "Appointment booked"
        );

        // 5. Notify
        self.ctx
            .emit(&AppointmentEvent::Booked {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id.clone(),
                doctor_id: appointment.doctor_id.clone(),
                date: appointment.date,
                time_slot: appointment.time_slot,
                occurred_at: now,
            })
            .await;

        Ok(BookAppointmentResult {
            appointment,
            hold_expires_at,
        })
    }
}

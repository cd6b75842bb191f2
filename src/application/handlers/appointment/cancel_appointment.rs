//! CancelAppointmentHandler - Command handler for cancelling a pending appointment.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::locks::LockKey;
use crate::domain::appointment::{
    Appointment, AppointmentEvent, AppointmentStatus, CancellationReason,
};
use crate::domain::foundation::{AppointmentId, PatientId};
use crate::domain::VisitError;

/// Command to cancel an appointment.
///
/// A patient may only cancel their own appointment. Without `patient_id`
/// the request comes from staff.
#[derive(Debug, Clone)]
pub struct CancelAppointmentCommand {
    pub appointment_id: AppointmentId,
    pub patient_id: Option<PatientId>,
}

/// Handler for cancellations.
///
/// Only `Pending` appointments can be cancelled; the slot goes back to the
/// ledger once the cancellation is stored.
pub struct CancelAppointmentHandler {
    ctx: Arc<VisitContext>,
}

impl CancelAppointmentHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: CancelAppointmentCommand) -> Result<Appointment, VisitError> {
        let _guard = self
            .ctx
            .locks
            .acquire(LockKey::Appointment(cmd.appointment_id))
            .await;

        let mut appointment = self
            .ctx
            .appointments
            .find_by_id(&cmd.appointment_id)
            .await?
            .ok_or_else(|| VisitError::not_found("appointment", cmd.appointment_id))?;

        let reason = match &cmd.patient_id {
            Some(patient_id) if *patient_id != appointment.patient_id => {
                return Err(VisitError::not_found("appointment", cmd.appointment_id));
            }
            Some(_) => CancellationReason::PatientRequest,
            None => CancellationReason::StaffRequest,
        };

        let now = self.ctx.now();
        appointment.cancel(reason, now)?;
        self.ctx
            .appointments
            .update(&appointment, AppointmentStatus::Pending)
            .await?;
        self.ctx.release_slot(&appointment).await;

        tracing::info!(
            appointment_id = %appointment.id,
            slot = %appointment.slot_key(),
            reason = reason.as_str(),
            "Appointment cancelled"
        );

        self.ctx
            .emit(&AppointmentEvent::Cancelled {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id.clone(),
                doctor_id: appointment.doctor_id.clone(),
                reason,
                occurred_at: now,
            })
            .await;

        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::appointment::{
        BookAppointmentCommand, BookAppointmentHandler,
    };
    use crate::ports::AppointmentRepository;
    use crate::application::test_support::{clinic_day, doctor, patient, Harness};
    use crate::domain::foundation::PaymentId;

    async fn booked(h: &Harness) -> Appointment {
        BookAppointmentHandler::new(h.ctx.clone())
            .handle(BookAppointmentCommand {
                patient_id: patient("P-1"),
                doctor_id: doctor("D101"),
                date: clinic_day(),
                time_slot: "10:00".to_string(),
            })
            .await
            .unwrap()
            .appointment
    }

    fn by_owner(id: AppointmentId) -> CancelAppointmentCommand {
        CancelAppointmentCommand {
            appointment_id: id,
            patient_id: Some(patient("P-1")),
        }
    }

    #[tokio::test]
    async fn cancelling_releases_the_slot() {
        let h = Harness::new();
        let appointment = booked(&h).await;

        let cancelled = CancelAppointmentHandler::new(h.ctx.clone())
            .handle(by_owner(appointment.id))
            .await
            .unwrap();

        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(
            cancelled.cancellation_reason,
            Some(CancellationReason::PatientRequest)
        );
        assert_eq!(h.ledger.holder(&appointment.slot_key()).await, None);
        assert!(h.events.has_event("appointment.cancelled.v1"));
    }

    #[tokio::test]
    async fn cancelled_slot_can_be_booked_again() {
        let h = Harness::new();
        let appointment = booked(&h).await;
        CancelAppointmentHandler::new(h.ctx.clone())
            .handle(by_owner(appointment.id))
            .await
            .unwrap();

        let again = booked(&h).await;
        assert_ne!(again.id, appointment.id);
    }

    #[tokio::test]
    async fn second_cancel_is_invalid_state() {
        let h = Harness::new();
        let appointment = booked(&h).await;
        let handler = CancelAppointmentHandler::new(h.ctx.clone());
        handler.handle(by_owner(appointment.id)).await.unwrap();

        let err = handler.handle(by_owner(appointment.id)).await.unwrap_err();
        assert!(matches!(err, VisitError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn confirmed_appointment_cannot_be_cancelled() {
        let h = Harness::new();
        let mut appointment = booked(&h).await;
        appointment
            .confirm(PaymentId::new(), h.ctx.now())
            .unwrap();
        h.appointments
            .update(&appointment, AppointmentStatus::Pending)
            .await
            .unwrap();

        let err = CancelAppointmentHandler::new(h.ctx.clone())
            .handle(by_owner(appointment.id))
            .await
            .unwrap_err();

        assert!(matches!(err, VisitError::InvalidState { .. }));
        assert!(h.ledger.holder(&appointment.slot_key()).await.is_some());
    }

    #[tokio::test]
    async fn another_patient_cannot_cancel() {
        let h = Harness::new();
        let appointment = booked(&h).await;

        let err = CancelAppointmentHandler::new(h.ctx.clone())
            .handle(CancelAppointmentCommand {
                appointment_id: appointment.id,
                patient_id: Some(patient("P-2")),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, VisitError::NotFound { .. }));
        assert!(h.ledger.holder(&appointment.slot_key()).await.is_some());
    }

    #[tokio::test]
    async fn staff_cancellation_is_recorded_as_such() {
        let h = Harness::new();
        let appointment = booked(&h).await;

        let cancelled = CancelAppointmentHandler::new(h.ctx.clone())
            .handle(CancelAppointmentCommand {
                appointment_id: appointment.id,
                patient_id: None,
            })
            .await
            .unwrap();
        assert_eq!(
            cancelled.cancellation_reason,
            Some(CancellationReason::StaffRequest)
        );
    }
}

//! InitiatePaymentHandler - Starts or resumes the payment for an appointment.
//!
//! Idempotent: while an attempt is active, every call returns the same
//! payment and the same checkout payload.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::locks::LockKey;
use crate::application::payment_sessions::{PaymentSession, PaymentSessionManager};
use crate::domain::appointment::AppointmentStatus;
use crate::domain::foundation::{AppointmentId, PatientId};
use crate::domain::payment::{PaymentStatus, PaymentSubject};
use crate::domain::VisitError;

/// Command to pay for an appointment.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub appointment_id: AppointmentId,
    /// Caller identity; `None` for staff-initiated payments.
    pub patient_id: Option<PatientId>,
}

pub struct InitiatePaymentHandler {
    ctx: Arc<VisitContext>,
    sessions: PaymentSessionManager,
}

impl InitiatePaymentHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self {
            sessions: PaymentSessionManager::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn handle(&self, cmd: InitiatePaymentCommand) -> Result<PaymentSession, VisitError> {
        let payment = {
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
                .filter(|a| cmd.patient_id.as_ref().map_or(true, |p| *p == a.patient_id))
                .ok_or_else(|| VisitError::not_found("appointment", cmd.appointment_id))?;

            if appointment.status != AppointmentStatus::Pending {
                return Err(VisitError::invalid_state(format!(
                    "Appointment {} is {}; only pending appointments can be paid",
                    appointment.id, appointment.status
                )));
            }

            let now = self.ctx.now();
            if appointment.is_hold_expired(now, self.ctx.config.hold_minutes) {
                let lapsed = self.ctx.lapse_hold(appointment, now).await?;
                return Err(VisitError::invalid_state(format!(
                    "Appointment {} hold has lapsed ({})",
                    lapsed.id, lapsed.status
                )));
            }

            let payment = self
                .sessions
                .ensure_payment(
                    PaymentSubject::Appointment(appointment.id),
                    self.ctx.config.consultation_fee.clone(),
                    now,
                )
                .await?;

            if payment.status == PaymentStatus::Initiated
                && appointment.payment_id != Some(payment.id)
            {
                appointment.attach_payment(payment.id, now)?;
                self.ctx
                    .appointments
                    .update(&appointment, AppointmentStatus::Pending)
                    .await?;
            }
            payment
        };

        self.sessions.open_session(payment).await
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
    use crate::domain::appointment::{Appointment, CancellationReason};
    use crate::ports::GatewayError;

    async fn book(h: &Harness) -> Appointment {
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

    fn pay(id: AppointmentId) -> InitiatePaymentCommand {
        InitiatePaymentCommand {
            appointment_id: id,
            patient_id: Some(patient("P-1")),
        }
    }

    #[tokio::test]
    async fn opens_a_checkout_and_attaches_the_payment() {
        let h = Harness::new();
        let appointment = book(&h).await;

        let session = InitiatePaymentHandler::new(h.ctx.clone())
            .handle(pay(appointment.id))
            .await
            .unwrap();

        assert_eq!(session.status, PaymentStatus::Initiated);
        assert_eq!(session.provider, "mock");
        let payload = session.payload.unwrap();
        assert_eq!(payload.amount_minor, 50_000);
        assert_eq!(payload.currency, "INR");

        let stored = h.appointments.find_by_id(&appointment.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_id, Some(session.payment_id));
    }

    #[tokio::test]
    async fn repeated_initiate_returns_the_same_session() {
        let h = Harness::new();
        let appointment = book(&h).await;
        let handler = InitiatePaymentHandler::new(h.ctx.clone());

        let first = handler.handle(pay(appointment.id)).await.unwrap();
        let second = handler.handle(pay(appointment.id)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.payments.count().await, 1);
        assert_eq!(h.gateway.order_count(), 1);
        assert_eq!(h.gateway.call_count("open"), 1);
    }

    #[tokio::test]
    async fn gateway_outage_leaves_a_resumable_payment() {
        let h = Harness::new();
        let appointment = book(&h).await;
        let handler = InitiatePaymentHandler::new(h.ctx.clone());
        h.gateway.set_error(GatewayError::timeout("gateway slow"));

        let err = handler.handle(pay(appointment.id)).await.unwrap_err();
        assert!(matches!(err, VisitError::GatewayUnavailable { .. }));
        assert_eq!(h.payments.count().await, 1);

        let session = handler.handle(pay(appointment.id)).await.unwrap();
        assert!(session.payload.is_some());
        assert_eq!(h.payments.count().await, 1);
    }

    #[tokio::test]
    async fn unknown_or_foreign_appointment_is_not_found() {
        let h = Harness::new();
        let appointment = book(&h).await;
        let handler = InitiatePaymentHandler::new(h.ctx.clone());

        let err = handler.handle(pay(AppointmentId::new())).await.unwrap_err();
        assert!(matches!(err, VisitError::NotFound { .. }));

        let err = handler
            .handle(InitiatePaymentCommand {
                appointment_id: appointment.id,
                patient_id: Some(patient("P-2")),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::NotFound { .. }));
        assert_eq!(h.payments.count().await, 0);
    }

    #[tokio::test]
    async fn cancelled_appointment_cannot_be_paid() {
        let h = Harness::new();
        let mut appointment = book(&h).await;
        appointment
            .cancel(CancellationReason::PatientRequest, h.ctx.now())
            .unwrap();
        h.appointments
            .update(&appointment, AppointmentStatus::Pending)
            .await
            .unwrap();

        let err = InitiatePaymentHandler::new(h.ctx.clone())
            .handle(pay(appointment.id))
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::InvalidState { .. }));
        assert!(!h.gateway.was_called("open"));
    }

    #[tokio::test]
    async fn lapsed_hold_is_closed_instead_of_paid() {
        let h = Harness::new();
        let appointment = book(&h).await;
        h.clock.advance_minutes(20);

        let err = InitiatePaymentHandler::new(h.ctx.clone())
            .handle(pay(appointment.id))
            .await
            .unwrap_err();

        assert!(matches!(err, VisitError::InvalidState { .. }));
        let stored = h.appointments.find_by_id(&appointment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
        assert_eq!(h.ledger.holder(&appointment.slot_key()).await, None);
        assert_eq!(h.payments.count().await, 0);
    }
}

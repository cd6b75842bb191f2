//! ReconcilePaymentsHandler - Settles payments the client never confirmed.
//!
//! Scans initiated payments older than the grace period and asks the
//! gateway what became of their orders:
//!
//! | Gateway says | Outcome |
//! |--------------|---------|
//! | captured | settled as a capture (confirms the appointment) |
//! | failed | recorded as failed with the gateway's reason |
//! | open, past the order timeout | failed with `gateway_timeout` |
//! | open, within the timeout | untouched |
//! | unreachable | untouched until the next pass |
//!
//! A payment that never got an order is failed once past the order timeout.

use std::sync::Arc;

use serde::Serialize;

use crate::application::context::VisitContext;
use crate::application::payment_sessions::{PaymentSessionManager, Settlement};
use crate::domain::foundation::Timestamp;
use crate::domain::payment::{Payment, PaymentStatus, REASON_GATEWAY_TIMEOUT};
use crate::domain::VisitError;
use crate::ports::GatewayOrderStatus;

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub succeeded: u32,
    pub failed: u32,
    pub timed_out: u32,
    pub untouched: u32,
}

impl ReconciliationReport {
    pub fn settled(&self) -> u32 {
        self.succeeded + self.failed + self.timed_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    TimedOut,
    Untouched,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed_out",
            Outcome::Untouched => "untouched",
        }
    }
}

pub struct ReconcilePaymentsHandler {
    ctx: Arc<VisitContext>,
    sessions: PaymentSessionManager,
}

impl ReconcilePaymentsHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self {
            sessions: PaymentSessionManager::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn handle(&self) -> Result<ReconciliationReport, VisitError> {
        let now = self.ctx.now();
        let cutoff = now.plus_secs(-self.ctx.config.reconcile_grace.num_seconds());
        let candidates = self
            .ctx
            .payments
            .find_initiated_before(cutoff, self.ctx.config.batch_size)
            .await?;

        let mut report = ReconciliationReport::default();
        for payment in candidates {
            let outcome = self.reconcile(&payment, now).await;
            match outcome {
                Outcome::Succeeded => report.succeeded += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::TimedOut => report.timed_out += 1,
                Outcome::Untouched => report.untouched += 1,
            }
            if outcome != Outcome::Untouched {
                tracing::info!(
                    audit = true,
                    payment_id = %payment.id,
                    subject = %payment.subject,
                    gateway_ref = payment.gateway_ref.as_deref().unwrap_or_default(),
                    outcome = outcome.as_str(),
                    "Payment reconciled"
                );
            }
        }

        if report.settled() > 0 {
            tracing::info!(
                succeeded = report.succeeded,
                failed = report.failed,
                timed_out = report.timed_out,
                untouched = report.untouched,
                "Payment reconciliation finished"
            );
        }
        Ok(report)
    }

    async fn reconcile(&self, payment: &Payment, now: Timestamp) -> Outcome {
        let overdue = now.duration_since(&payment.created_at) >= self.ctx.config.order_timeout;

        let Some(order_ref) = payment.gateway_ref.as_deref() else {
            return if overdue {
                self.apply(payment, timeout()).await
            } else {
                Outcome::Untouched
            };
        };

        match self.ctx.gateway.fetch_status(order_ref).await {
            Ok(GatewayOrderStatus::Captured { payment_ref }) => {
                self.apply(payment, Settlement::Captured { payment_ref }).await
            }
            Ok(GatewayOrderStatus::Failed { reason }) => {
                self.apply(payment, Settlement::Declined { reason }).await
            }
            Ok(GatewayOrderStatus::Open) if overdue => self.apply(payment, timeout()).await,
            Ok(GatewayOrderStatus::Open) => Outcome::Untouched,
            Err(e) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    order_ref,
                    error = %e,
                    "Order status unavailable; retrying next pass"
                );
                Outcome::Untouched
            }
        }
    }

    async fn apply(&self, payment: &Payment, settlement: Settlement) -> Outcome {
        match self.sessions.settle(payment, settlement).await {
            Ok(confirmation) => match confirmation.status {
                PaymentStatus::Success => Outcome::Succeeded,
                PaymentStatus::Failed
                    if confirmation.failure_reason.as_deref() == Some(REASON_GATEWAY_TIMEOUT) =>
                {
                    Outcome::TimedOut
                }
                PaymentStatus::Failed => Outcome::Failed,
                PaymentStatus::Initiated => Outcome::Untouched,
            },
            // Capture for an appointment that can no longer be confirmed;
            // the payment was recorded as failed.
            Err(VisitError::InvalidState { .. }) => Outcome::Failed,
            Err(e) => {
                tracing::warn!(payment_id = %payment.id, error = %e, "Reconciliation write failed");
                Outcome::Untouched
            }
        }
    }
}

fn timeout() -> Settlement {
    Settlement::Declined {
        reason: REASON_GATEWAY_TIMEOUT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::appointment::{
        BookAppointmentCommand, BookAppointmentHandler,
    };
    use crate::application::handlers::payment::{InitiatePaymentCommand, InitiatePaymentHandler};
    use crate::application::payment_sessions::PaymentSession;
    use crate::ports::{AppointmentRepository, PaymentRepository};
    use crate::application::test_support::{clinic_day, doctor, patient, Harness};
    use crate::domain::appointment::{Appointment, AppointmentStatus};
    use crate::ports::GatewayError;

    /// Long holds so reconciliation, not the sweep, decides the outcome.
    fn harness() -> Harness {
        Harness::with_config(|c| c.with_hold_minutes(120))
    }

    async fn book_and_initiate(h: &Harness, slot: &str) -> (Appointment, PaymentSession) {
        let appointment = BookAppointmentHandler::new(h.ctx.clone())
            .handle(BookAppointmentCommand {
                patient_id: patient("P-1"),
                doctor_id: doctor("D101"),
                date: clinic_day(),
                time_slot: slot.to_string(),
            })
            .await
            .unwrap()
            .appointment;
        let session = InitiatePaymentHandler::new(h.ctx.clone())
            .handle(InitiatePaymentCommand {
                appointment_id: appointment.id,
                patient_id: None,
            })
            .await
            .unwrap();
        (appointment, session)
    }

    fn order_ref(session: &PaymentSession) -> String {
        session.payload.as_ref().unwrap().order_ref.clone()
    }

    async fn payment(h: &Harness, session: &PaymentSession) -> Payment {
        h.payments.find_by_id(&session.payment_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn payments_within_the_grace_period_are_not_scanned() {
        let h = harness();
        book_and_initiate(&h, "11:00").await;
        h.clock.advance_minutes(5);

        let report = ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();
        assert_eq!(report, ReconciliationReport::default());
        assert!(!h.gateway.was_called("fetch_status"));
    }

    #[tokio::test]
    async fn captured_order_confirms_the_appointment() {
        let h = harness();
        let (appointment, session) = book_and_initiate(&h, "11:00").await;
        h.gateway.set_order_status(
            &order_ref(&session),
            GatewayOrderStatus::Captured {
                payment_ref: "pay_late".to_string(),
            },
        );
        h.clock.advance_minutes(20);

        let report = ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(payment(&h, &session).await.status, PaymentStatus::Success);
        let stored = h.appointments.find_by_id(&appointment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn failed_order_is_recorded() {
        let h = harness();
        let (appointment, session) = book_and_initiate(&h, "11:00").await;
        h.gateway.set_order_status(
            &order_ref(&session),
            GatewayOrderStatus::Failed {
                reason: "insufficient funds".to_string(),
            },
        );
        h.clock.advance_minutes(20);

        let report = ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        let stored = payment(&h, &session).await;
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("insufficient funds"));
        let appt = h.appointments.find_by_id(&appointment.id).await.unwrap().unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn open_order_fails_only_after_the_timeout() {
        let h = harness();
        let (_, session) = book_and_initiate(&h, "13:00").await;
        let handler = ReconcilePaymentsHandler::new(h.ctx.clone());

        h.clock.advance_minutes(30);
        let early = handler.handle().await.unwrap();
        assert_eq!(early.untouched, 1);
        assert_eq!(payment(&h, &session).await.status, PaymentStatus::Initiated);

        h.clock.advance_minutes(31);
        let late = handler.handle().await.unwrap();
        assert_eq!(late.timed_out, 1);
        let stored = payment(&h, &session).await;
        assert_eq!(stored.failure_reason.as_deref(), Some(REASON_GATEWAY_TIMEOUT));
    }

    #[tokio::test]
    async fn gateway_outage_leaves_payments_for_the_next_pass() {
        let h = harness();
        let (_, session) = book_and_initiate(&h, "11:00").await;
        h.clock.advance_minutes(90);
        h.gateway
            .set_method_error("fetch_status", GatewayError::network("connection reset"));

        let report = ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();

        assert_eq!(report.untouched, 1);
        assert_eq!(payment(&h, &session).await.status, PaymentStatus::Initiated);
    }

    #[tokio::test]
    async fn payment_without_an_order_times_out() {
        let h = harness();
        let appointment = BookAppointmentHandler::new(h.ctx.clone())
            .handle(BookAppointmentCommand {
                patient_id: patient("P-1"),
                doctor_id: doctor("D101"),
                date: clinic_day(),
                time_slot: "14:00".to_string(),
            })
            .await
            .unwrap()
            .appointment;
        h.gateway.set_error(GatewayError::timeout("slow"));
        let _ = InitiatePaymentHandler::new(h.ctx.clone())
            .handle(InitiatePaymentCommand {
                appointment_id: appointment.id,
                patient_id: None,
            })
            .await
            .unwrap_err();
        h.clock.advance_minutes(61);

        let report = ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();

        assert_eq!(report.timed_out, 1);
        assert!(!h.gateway.was_called("fetch_status"));
    }

    #[tokio::test]
    async fn late_capture_for_a_cancelled_appointment_counts_as_failed() {
        let h = Harness::new();
        let (appointment, session) = book_and_initiate(&h, "11:00").await;
        h.gateway.set_order_status(
            &order_ref(&session),
            GatewayOrderStatus::Captured {
                payment_ref: "pay_late".to_string(),
            },
        );
        h.clock.advance_minutes(20);

        let report = ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        let appt = h.appointments.find_by_id(&appointment.id).await.unwrap().unwrap();
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn capture_after_a_timeout_is_flagged_for_refund() {
        let h = harness();
        let (_, session) = book_and_initiate(&h, "14:00").await;
        h.clock.advance_minutes(61);
        ReconcilePaymentsHandler::new(h.ctx.clone())
            .handle()
            .await
            .unwrap();

        let confirmation = PaymentSessionManager::new(h.ctx.clone())
            .confirm(
                session.payment_id,
                &h.gateway.sign_success(&order_ref(&session), "pay_slow"),
            )
            .await
            .unwrap();

        assert_eq!(confirmation.status, PaymentStatus::Failed);
        assert_eq!(
            confirmation.failure_reason.as_deref(),
            Some(REASON_GATEWAY_TIMEOUT)
        );
        assert_eq!(payment(&h, &session).await.payment_ref.as_deref(), Some("pay_slow"));
        assert_eq!(h.events.events_of_type("payment.refund_required.v1").len(), 1);
    }
}

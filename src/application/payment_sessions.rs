//! Payment session manager.
//!
//! Mediates exactly one payment attempt per payable subject and talks to the
//! payment gateway on the engine's behalf.
//!
//! # Locking
//!
//! Store reads and writes for a subject happen under that subject's lock.
//! Gateway calls (`open`, `verify`) happen with no lock held; the result is
//! applied afterwards under the lock against freshly loaded state, so the
//! first writer wins and later callers see the stored outcome.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::appointment::{AppointmentEvent, AppointmentStatus};
use crate::domain::foundation::{AppointmentId, Money, PaymentId, Timestamp};
use crate::domain::payment::{
    GatewaySession, Payment, PaymentEvent, PaymentStatus, PaymentSubject,
    REASON_SUBJECT_NOT_PAYABLE,
};
use crate::domain::VisitError;
use crate::ports::{
    GatewayErrorCode, GatewayOrderStatus, GatewayResult, InsertOutcome, OpenOrderRequest,
};

use super::context::VisitContext;
use super::locks::LockKey;

/// Failure reason recorded when the widget reports a failure without detail.
const REASON_DECLINED: &str = "declined";

/// What the client needs to drive (or resume) a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub payment_id: PaymentId,
    pub provider: String,
    pub status: PaymentStatus,
    /// Gateway checkout payload; absent once the payment has settled
    /// without ever opening an order.
    pub payload: Option<GatewaySession>,
}

impl From<&Payment> for PaymentSession {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            provider: payment.provider.clone(),
            status: payment.status,
            payload: payment.session.clone(),
        }
    }
}

/// Stored outcome of a payment, returned by every confirm call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentConfirmation {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub subject: PaymentSubject,
    pub failure_reason: Option<String>,
}

impl From<&Payment> for PaymentConfirmation {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            status: payment.status,
            subject: payment.subject.clone(),
            failure_reason: payment.failure_reason.clone(),
        }
    }
}

/// A gateway outcome to apply to an initiated payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Captured { payment_ref: String },
    Declined { reason: String },
}

pub struct PaymentSessionManager {
    ctx: Arc<VisitContext>,
}

impl PaymentSessionManager {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    /// Starts or resumes the payment for a subject that needs no further
    /// checks (invoices). Appointment payments go through
    /// `InitiatePaymentHandler`, which validates the appointment first.
    pub async fn initiate(
        &self,
        subject: PaymentSubject,
        amount: Money,
    ) -> Result<PaymentSession, VisitError> {
        let payment = {
            let _guard = self.ctx.locks.acquire(LockKey::for_subject(&subject)).await;
            self.ensure_payment(subject, amount, self.ctx.now()).await?
        };
        self.open_session(payment).await
    }

    /// Returns the subject's active payment, creating one if there is none.
    ///
    /// Caller must hold the subject lock.
    pub(crate) async fn ensure_payment(
        &self,
        subject: PaymentSubject,
        amount: Money,
        now: Timestamp,
    ) -> Result<Payment, VisitError> {
        if let Some(existing) = self.ctx.payments.find_active_by_subject(&subject).await? {
            tracing::debug!(payment_id = %existing.id, subject = %subject, "Resuming payment");
            return Ok(existing);
        }

        let payment = Payment::initiate(subject, amount, self.ctx.gateway.provider(), now);
        match self.ctx.payments.insert_if_no_active(&payment).await? {
            InsertOutcome::Inserted => {
                tracing::info!(
                    payment_id = %payment.id,
                    subject = %payment.subject,
                    amount_minor = payment.amount.amount_minor(),
                    "Payment initiated"
                );
                Ok(payment)
            }
            InsertOutcome::Existing(existing) => Ok(existing),
        }
    }

    /// Opens the gateway order for an initiated payment without a session.
    ///
    /// The order is opened with no lock held. Whoever stores a session first
    /// wins; the gateway's idempotency key makes a repeated open return the
    /// same order, so later callers get the identical payload.
    pub(crate) async fn open_session(&self, payment: Payment) -> Result<PaymentSession, VisitError> {
        if payment.status != PaymentStatus::Initiated || payment.session.is_some() {
            return Ok(PaymentSession::from(&payment));
        }

        let request = OpenOrderRequest::for_payment(
            payment.id,
            payment.amount.clone(),
            payment.subject.to_string(),
        );
        let session = self.ctx.gateway.open(request).await.map_err(|e| {
            tracing::warn!(payment_id = %payment.id, error = %e, "Gateway order open failed");
            VisitError::from(e)
        })?;

        let _guard = self
            .ctx
            .locks
            .acquire(LockKey::for_subject(&payment.subject))
            .await;
        let mut current = self.load(&payment.id).await?;
        match current.status {
            PaymentStatus::Failed => {
                return Err(VisitError::invalid_state(format!(
                    "Payment {} failed while opening the checkout; start a new attempt",
                    current.id
                )))
            }
            PaymentStatus::Success => return Ok(PaymentSession::from(&current)),
            PaymentStatus::Initiated if current.session.is_some() => {
                return Ok(PaymentSession::from(&current))
            }
            PaymentStatus::Initiated => {}
        }

        current.attach_session(session, self.ctx.now())?;
        self.ctx
            .payments
            .update(&current, PaymentStatus::Initiated)
            .await?;
        tracing::info!(
            payment_id = %current.id,
            gateway_ref = current.gateway_ref.as_deref().unwrap_or_default(),
            "Checkout session opened"
        );
        Ok(PaymentSession::from(&current))
    }

    /// Verifies a checkout result and settles the payment once.
    ///
    /// A successful payment returns its stored outcome without consulting
    /// the gateway. A failed payment still has a signed capture checked, so
    /// money taken after the payment gave up is flagged for refund.
    ///
    /// A failure report from the widget is unsigned and proves nothing on its
    /// own. Only the order status fetched from the gateway settles the
    /// payment; while the order is still open the payment stays initiated.
    pub async fn confirm(
        &self,
        payment_id: PaymentId,
        result: &GatewayResult,
    ) -> Result<PaymentConfirmation, VisitError> {
        let payment = self.load(&payment_id).await?;
        match payment.status {
            PaymentStatus::Success => return self.recorded(payment).await,
            PaymentStatus::Failed if !result.claims_capture() => {
                return Ok(PaymentConfirmation::from(&payment))
            }
            _ => {}
        }

        let verified = self.ctx.gateway.verify(result).await.map_err(|e| {
            if e.code == GatewayErrorCode::VerificationFailed {
                tracing::warn!(payment_id = %payment_id, error = %e, "Checkout result rejected");
            }
            VisitError::from(e)
        })?;
        Self::check_attribution(&payment, &verified.order_ref)?;

        match (payment.status, verified.success, verified.payment_ref) {
            (PaymentStatus::Failed, true, Some(payment_ref)) => {
                self.flag_late_capture(&payment, payment_ref).await
            }
            (PaymentStatus::Failed, _, _) => Ok(PaymentConfirmation::from(&payment)),
            (_, true, payment_ref) => {
                self.settle(
                    &payment,
                    Settlement::Captured {
                        payment_ref: payment_ref.unwrap_or_default(),
                    },
                )
                .await
            }
            (_, false, _) => {
                let reported = verified
                    .failure_reason
                    .unwrap_or_else(|| REASON_DECLINED.to_string());
                self.settle_reported_failure(&payment, &verified.order_ref, reported)
                    .await
            }
        }
    }

    fn check_attribution(payment: &Payment, order_ref: &str) -> Result<(), VisitError> {
        if payment.gateway_ref.as_deref() == Some(order_ref) {
            return Ok(());
        }
        tracing::warn!(
            payment_id = %payment.id,
            order_ref = %order_ref,
            expected = payment.gateway_ref.as_deref().unwrap_or_default(),
            "Checkout result belongs to another order"
        );
        Err(VisitError::verification_failed(
            "checkout result does not belong to this payment",
        ))
    }

    /// Settles a widget failure report only once the gateway agrees.
    async fn settle_reported_failure(
        &self,
        payment: &Payment,
        order_ref: &str,
        reported: String,
    ) -> Result<PaymentConfirmation, VisitError> {
        let status = self.ctx.gateway.fetch_status(order_ref).await.map_err(|e| {
            tracing::warn!(payment_id = %payment.id, error = %e, "Order status lookup failed");
            VisitError::from(e)
        })?;

        match status {
            GatewayOrderStatus::Failed { reason } => {
                let reason = if reason.is_empty() { reported } else { reason };
                self.settle(payment, Settlement::Declined { reason }).await
            }
            GatewayOrderStatus::Captured { payment_ref } => {
                self.settle(payment, Settlement::Captured { payment_ref }).await
            }
            GatewayOrderStatus::Open => {
                tracing::info!(
                    payment_id = %payment.id,
                    order_ref = %order_ref,
                    reported = %reported,
                    "Reported failure not confirmed by the gateway; order still open"
                );
                Ok(PaymentConfirmation::from(payment))
            }
        }
    }

    /// Records a verified capture on an already failed payment and asks for
    /// a refund. Repeats of the same capture are not flagged again.
    async fn flag_late_capture(
        &self,
        payment: &Payment,
        payment_ref: String,
    ) -> Result<PaymentConfirmation, VisitError> {
        let _guard = self
            .ctx
            .locks
            .acquire(LockKey::for_subject(&payment.subject))
            .await;
        let mut current = self.load(&payment.id).await?;
        let now = self.ctx.now();
        if !current.record_late_capture(payment_ref.as_str(), now)? {
            return Ok(PaymentConfirmation::from(&current));
        }
        self.ctx
            .payments
            .update(&current, PaymentStatus::Failed)
            .await?;
        self.request_refund(&current, &payment_ref, now).await;
        Ok(PaymentConfirmation::from(&current))
    }

    async fn request_refund(&self, payment: &Payment, payment_ref: &str, now: Timestamp) {
        tracing::warn!(
            audit = true,
            payment_id = %payment.id,
            subject = %payment.subject,
            payment_ref = %payment_ref,
            reason = payment.failure_reason.as_deref().unwrap_or_default(),
            "Captured payment could not be applied; refund required"
        );
        self.ctx
            .emit(&PaymentEvent::refund_required(payment, payment_ref, now))
            .await;
    }

    /// Applies a gateway outcome to an initiated payment exactly once.
    ///
    /// A capture also confirms the appointment it pays for. If that
    /// appointment can no longer be confirmed, the payment is failed with
    /// `subject_not_payable`, a refund warning is logged, and `InvalidState`
    /// is returned.
    pub(crate) async fn settle(
        &self,
        payment: &Payment,
        settlement: Settlement,
    ) -> Result<PaymentConfirmation, VisitError> {
        let _guard = self
            .ctx
            .locks
            .acquire(LockKey::for_subject(&payment.subject))
            .await;
        let mut current = self.load(&payment.id).await?;
        if current.is_terminal() {
            return Ok(PaymentConfirmation::from(&current));
        }
        let now = self.ctx.now();

        match settlement {
            Settlement::Declined { reason } => {
                current.fail(reason, now)?;
                self.store_settled(&current).await?;
                Ok(PaymentConfirmation::from(&current))
            }
            Settlement::Captured { payment_ref } => match current.subject.clone() {
                PaymentSubject::Appointment(appointment_id) => {
                    self.capture_for_appointment(current, appointment_id, payment_ref, now)
                        .await
                }
                PaymentSubject::Invoice(invoice_id) => {
                    current.succeed(payment_ref, now)?;
                    self.store_settled(&current).await?;
                    self.ctx
                        .emit(&PaymentEvent::InvoicePaid {
                            invoice_id,
                            payment_id: current.id,
                            amount_minor: current.amount.amount_minor(),
                            currency: current.amount.currency().to_string(),
                            occurred_at: now,
                        })
                        .await;
                    Ok(PaymentConfirmation::from(&current))
                }
            },
        }
    }

    async fn capture_for_appointment(
        &self,
        mut payment: Payment,
        appointment_id: AppointmentId,
        payment_ref: String,
        now: Timestamp,
    ) -> Result<PaymentConfirmation, VisitError> {
        let appointment = self.ctx.appointments.find_by_id(&appointment_id).await?;

        let mut appointment = match appointment {
            Some(appt)
                if appt.status == AppointmentStatus::Confirmed
                    && appt.payment_id == Some(payment.id) =>
            {
                // Appointment side already written by an interrupted settle.
                payment.succeed(payment_ref, now)?;
                self.store_settled(&payment).await?;
                return Ok(PaymentConfirmation::from(&payment));
            }
            Some(appt)
                if appt.status == AppointmentStatus::Pending
                    && appt.payment_id.map_or(true, |id| id == payment.id) =>
            {
                appt
            }
            other => {
                let state = other
                    .as_ref()
                    .map(|a| a.status.as_str())
                    .unwrap_or("missing");
                return self
                    .reject_capture(payment, payment_ref, appointment_id, state, now)
                    .await;
            }
        };

        if appointment.is_hold_expired(now, self.ctx.config.hold_minutes) {
            self.ctx.lapse_hold(appointment, now).await?;
            return self
                .reject_capture(payment, payment_ref, appointment_id, "expired hold", now)
                .await;
        }

        // Appointment first: if the payment write is lost, reconciliation
        // finds the capture and completes it.
        appointment.confirm(payment.id, now)?;
        self.ctx
            .appointments
            .update(&appointment, AppointmentStatus::Pending)
            .await?;
        payment.succeed(payment_ref, now)?;
        self.store_settled(&payment).await?;

        tracing::info!(
            appointment_id = %appointment.id,
            payment_id = %payment.id,
            slot = %appointment.slot_key(),
            "Appointment confirmed"
        );
        self.ctx
            .emit(&AppointmentEvent::Confirmed {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id.clone(),
                doctor_id: appointment.doctor_id.clone(),
                date: appointment.date,
                time_slot: appointment.time_slot,
                payment_id: payment.id,
                occurred_at: now,
            })
            .await;
        Ok(PaymentConfirmation::from(&payment))
    }

    async fn reject_capture(
        &self,
        mut payment: Payment,
        payment_ref: String,
        appointment_id: AppointmentId,
        state: &str,
        now: Timestamp,
    ) -> Result<PaymentConfirmation, VisitError> {
        payment.payment_ref = Some(payment_ref.clone());
        payment.fail(REASON_SUBJECT_NOT_PAYABLE, now)?;
        self.store_settled(&payment).await?;
        tracing::info!(
            payment_id = %payment.id,
            appointment_id = %appointment_id,
            appointment_state = state,
            "Capture arrived for an appointment that can no longer be confirmed"
        );
        self.request_refund(&payment, &payment_ref, now).await;
        Err(VisitError::invalid_state(format!(
            "Appointment {} cannot be confirmed ({}); payment {} recorded as failed",
            appointment_id, state, payment.id
        )))
    }

    /// Stored result for an already settled payment.
    ///
    /// A successful appointment payment whose appointment is still pending
    /// (an interrupted settle) gets its confirmation completed here.
    async fn recorded(&self, payment: Payment) -> Result<PaymentConfirmation, VisitError> {
        if let (PaymentStatus::Success, PaymentSubject::Appointment(appointment_id)) =
            (payment.status, &payment.subject)
        {
            let _guard = self
                .ctx
                .locks
                .acquire(LockKey::Appointment(*appointment_id))
                .await;
            if let Some(mut appointment) =
                self.ctx.appointments.find_by_id(appointment_id).await?
            {
                if appointment.status == AppointmentStatus::Pending
                    && appointment.payment_id.map_or(true, |id| id == payment.id)
                {
                    let now = self.ctx.now();
                    appointment.confirm(payment.id, now)?;
                    self.ctx
                        .appointments
                        .update(&appointment, AppointmentStatus::Pending)
                        .await?;
                    tracing::info!(
                        appointment_id = %appointment.id,
                        payment_id = %payment.id,
                        "Completed confirmation for an already settled payment"
                    );
                    self.ctx
                        .emit(&AppointmentEvent::Confirmed {
                            appointment_id: appointment.id,
                            patient_id: appointment.patient_id.clone(),
                            doctor_id: appointment.doctor_id.clone(),
                            date: appointment.date,
                            time_slot: appointment.time_slot,
                            payment_id: payment.id,
                            occurred_at: now,
                        })
                        .await;
                }
            }
        }
        Ok(PaymentConfirmation::from(&payment))
    }

    async fn store_settled(&self, payment: &Payment) -> Result<(), VisitError> {
        self.ctx
            .payments
            .update(payment, PaymentStatus::Initiated)
            .await?;
        tracing::info!(
            payment_id = %payment.id,
            subject = %payment.subject,
            status = %payment.status,
            reason = payment.failure_reason.as_deref().unwrap_or_default(),
            "Payment settled"
        );
        self.ctx
            .emit(&PaymentEvent::settled(payment, payment.updated_at))
            .await;
        Ok(())
    }

    async fn load(&self, id: &PaymentId) -> Result<Payment, VisitError> {
        self.ctx
            .payments
            .find_by_id(id)
            .await?
            .ok_or_else(|| VisitError::not_found("payment", id))
    }
}

//! Payment aggregate.
//!
//! One payment attempt against one subject. The engine guarantees at most
//! one active (initiated or successful) payment per subject; this type
//! guarantees a payment settles exactly once.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, PaymentId, StateMachine, Timestamp,
};

use super::{PaymentStatus, PaymentSubject};

/// Failure reason recorded when reconciliation gives up on an open order.
pub const REASON_GATEWAY_TIMEOUT: &str = "gateway_timeout";

/// Failure reason recorded when a capture arrives for a subject that can no
/// longer be settled (for example an appointment already cancelled).
pub const REASON_SUBJECT_NOT_PAYABLE: &str = "subject_not_payable";

/// Checkout payload the client hands to the gateway's widget.
///
/// Stored server-side so a resumed checkout gets the identical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySession {
    pub provider: String,
    /// Gateway order reference; becomes the payment's `gateway_ref`.
    pub order_ref: String,
    /// Public key id the client widget needs.
    pub key_id: String,
    pub amount_minor: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

/// Payment aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub subject: PaymentSubject,
    pub amount: Money,
    pub provider: String,
    pub status: PaymentStatus,

    /// Gateway order reference, set once the order is opened.
    pub gateway_ref: Option<String>,

    /// Gateway payment reference, set on capture.
    pub payment_ref: Option<String>,

    pub session: Option<GatewaySession>,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Payment {
    /// Creates an initiated payment with no gateway order yet.
    pub fn initiate(
        subject: PaymentSubject,
        amount: Money,
        provider: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            subject,
            amount,
            provider: provider.into(),
            status: PaymentStatus::Initiated,
            gateway_ref: None,
            payment_ref: None,
            session: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Stores the checkout session returned by the gateway.
    ///
    /// Re-attaching the same order is a no-op; a different order is rejected
    /// so the client never sees two payloads for one payment.
    pub fn attach_session(&mut self, session: GatewaySession, now: Timestamp) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Initiated {
            return Err(DomainError::new(
                ErrorCode::InvalidState,
                format!("Payment {} is already {}", self.id, self.status),
            ));
        }
        match &self.session {
            Some(existing) if existing.order_ref == session.order_ref => Ok(()),
            Some(existing) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Payment {} already bound to order {}",
                    self.id, existing.order_ref
                ),
            )),
            None => {
                self.gateway_ref = Some(session.order_ref.clone());
                self.session = Some(session);
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// Records a verified capture.
    pub fn succeed(&mut self, payment_ref: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Success)?;
        self.payment_ref = Some(payment_ref.into());
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed or abandoned attempt.
    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Keeps the reference of a capture that arrived after the payment failed.
    ///
    /// The status stays FAILED; the money has to be refunded. Returns false
    /// when this capture was already recorded.
    pub fn record_late_capture(
        &mut self,
        payment_ref: impl Into<String>,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        if self.status != PaymentStatus::Failed {
            return Err(DomainError::new(
                ErrorCode::InvalidState,
                format!("Payment {} is {}, not failed", self.id, self.status),
            ));
        }
        let payment_ref = payment_ref.into();
        if self.payment_ref.as_deref() == Some(payment_ref.as_str()) {
            return Ok(false);
        }
        self.payment_ref = Some(payment_ref);
        self.updated_at = now;
        Ok(true)
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|err| {
            DomainError::new(
                ErrorCode::InvalidState,
                format!("Payment {}: {}", self.id, err),
            )
        })?;
        Ok(())
    }
}

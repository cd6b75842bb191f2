//! Payment domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, InvoiceId, PaymentId, Timestamp};

use super::Payment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentEvent {
    Succeeded {
        payment_id: PaymentId,
        subject_type: String,
        subject_id: String,
        amount_minor: i64,
        currency: String,
        payment_ref: Option<String>,
        occurred_at: Timestamp,
    },

    Failed {
        payment_id: PaymentId,
        subject_type: String,
        subject_id: String,
        reason: Option<String>,
        occurred_at: Timestamp,
    },

    /// Money was captured for a payment that could not be applied.
    RefundRequired {
        payment_id: PaymentId,
        subject_type: String,
        subject_id: String,
        payment_ref: String,
        amount_minor: i64,
        currency: String,
        reason: Option<String>,
        occurred_at: Timestamp,
    },

    /// An invoice payment succeeded; consumed by the billing system.
    InvoicePaid {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
        amount_minor: i64,
        currency: String,
        occurred_at: Timestamp,
    },
}

impl PaymentEvent {
    /// Builds the settlement event for a terminal payment.
    pub fn settled(payment: &Payment, occurred_at: Timestamp) -> Self {
        if payment.status == super::PaymentStatus::Success {
            PaymentEvent::Succeeded {
                payment_id: payment.id,
                subject_type: payment.subject.subject_type().to_string(),
                subject_id: payment.subject.subject_id(),
                amount_minor: payment.amount.amount_minor(),
                currency: payment.amount.currency().to_string(),
                payment_ref: payment.payment_ref.clone(),
                occurred_at,
            }
        } else {
            PaymentEvent::Failed {
                payment_id: payment.id,
                subject_type: payment.subject.subject_type().to_string(),
                subject_id: payment.subject.subject_id(),
                reason: payment.failure_reason.clone(),
                occurred_at,
            }
        }
    }

    /// Builds the refund notice for a failed payment that was captured anyway.
    pub fn refund_required(payment: &Payment, payment_ref: &str, occurred_at: Timestamp) -> Self {
        PaymentEvent::RefundRequired {
            payment_id: payment.id,
            subject_type: payment.subject.subject_type().to_string(),
            subject_id: payment.subject.subject_id(),
            payment_ref: payment_ref.to_string(),
            amount_minor: payment.amount.amount_minor(),
            currency: payment.amount.currency().to_string(),
            reason: payment.failure_reason.clone(),
            occurred_at,
        }
    }

    fn payment_id(&self) -> PaymentId {
        match self {
            PaymentEvent::Succeeded { payment_id, .. }
            | PaymentEvent::Failed { payment_id, .. }
            | PaymentEvent::RefundRequired { payment_id, .. }
            | PaymentEvent::InvoicePaid { payment_id, .. } => *payment_id,
        }
    }
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::Succeeded { .. } => "payment.succeeded.v1",
            PaymentEvent::Failed { .. } => "payment.failed.v1",
            PaymentEvent::RefundRequired { .. } => "payment.refund_required.v1",
            PaymentEvent::InvoicePaid { .. } => "invoice.paid.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        self.payment_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Payment"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            PaymentEvent::Succeeded { occurred_at, .. }
            | PaymentEvent::Failed { occurred_at, .. }
            | PaymentEvent::RefundRequired { occurred_at, .. }
            | PaymentEvent::InvoicePaid { occurred_at, .. } => *occurred_at,
        }
    }
}

//! InitiateInvoicePaymentHandler - Starts or resumes the payment for an invoice.
//!
//! Invoices live in the billing system; the engine only guarantees a single
//! active payment per invoice id.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::payment_sessions::{PaymentSession, PaymentSessionManager};
use crate::domain::foundation::{InvoiceId, Money};
use crate::domain::payment::PaymentSubject;
use crate::domain::VisitError;

/// Command to pay an invoice, in the clinic's currency.
#[derive(Debug, Clone)]
pub struct InitiateInvoicePaymentCommand {
    pub invoice_id: InvoiceId,
    pub amount_minor: i64,
}

pub struct InitiateInvoicePaymentHandler {
    ctx: Arc<VisitContext>,
    sessions: PaymentSessionManager,
}

impl InitiateInvoicePaymentHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self {
            sessions: PaymentSessionManager::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiateInvoicePaymentCommand,
    ) -> Result<PaymentSession, VisitError> {
        let amount = Money::new(cmd.amount_minor, self.ctx.config.consultation_fee.currency())?;
        self.sessions
            .initiate(PaymentSubject::Invoice(cmd.invoice_id), amount)
            .await
    }
}

//! ConfirmPaymentHandler - Applies a checkout result to a payment.
//!
//! Verification, attribution, and the exactly-once settle live in the
//! payment session manager; this handler is the engine-facing entry point.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::payment_sessions::{PaymentConfirmation, PaymentSessionManager};
use crate::domain::foundation::PaymentId;
use crate::domain::VisitError;
use crate::ports::GatewayResult;

/// Command carrying the gateway widget's result.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub payment_id: PaymentId,
    pub result: GatewayResult,
}

pub struct ConfirmPaymentHandler {
    sessions: PaymentSessionManager,
}

impl ConfirmPaymentHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self {
            sessions: PaymentSessionManager::new(ctx),
        }
    }

    pub async fn handle(&self, cmd: ConfirmPaymentCommand) -> Result<PaymentConfirmation, VisitError> {
        self.sessions.confirm(cmd.payment_id, &cmd.result).await
    }
}

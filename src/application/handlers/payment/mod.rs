//! Payment handlers.
//!
//! ## Commands
//! - Initiating (or resuming) an appointment payment
//! - Initiating (or resuming) an invoice payment
//! - Confirming a checkout result
//! - Reconciling payments the client never confirmed

mod confirm_payment;
mod initiate_invoice_payment;
mod initiate_payment;
mod reconcile_payments;

pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler};
pub use initiate_invoice_payment::{InitiateInvoicePaymentCommand, InitiateInvoicePaymentHandler};
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler};
pub use reconcile_payments::{ReconcilePaymentsHandler, ReconciliationReport};

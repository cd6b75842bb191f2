//! VisitEngine - the single entry point for visit lifecycle operations.
//!
//! Wraps the individual handlers behind one type so that adapters (the
//! HTTP router, the sweeper, tests) depend on a single `Arc<VisitEngine>`.
//!
//! ## Patient operations
//! `book_appointment`, `list_available_slots`, `get_appointment`,
//! `cancel_appointment`, `initiate_payment`, `confirm_payment`
//!
//! ## Staff operations
//! `generate_token`, `advance_token`, `cancel_token`, `remove_token`,
//! `queue_stats`, `initiate_invoice_payment`
//!
//! ## Maintenance
//! `expire_stale_holds`, `reconcile_payments`

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::appointment::Appointment;
use crate::domain::foundation::{
    AppointmentId, DepartmentId, DoctorId, InvoiceId, PatientId, PaymentId, StaffId, TokenId,
};
use crate::domain::queue::{QueueStats, Token};
use crate::domain::VisitError;
use crate::ports::GatewayResult;

use super::context::VisitContext;
use super::handlers::appointment::{
    BookAppointmentCommand, BookAppointmentHandler, BookAppointmentResult,
    CancelAppointmentCommand, CancelAppointmentHandler, ExpireStaleHoldsHandler,
    GetAppointmentHandler, GetAppointmentQuery, HoldSweepReport, ListAvailableSlotsHandler,
    ListAvailableSlotsQuery, ListAvailableSlotsResult,
};
use super::handlers::payment::{
    ConfirmPaymentCommand, ConfirmPaymentHandler, InitiateInvoicePaymentCommand,
    InitiateInvoicePaymentHandler, InitiatePaymentCommand, InitiatePaymentHandler,
    ReconcilePaymentsHandler, ReconciliationReport,
};
use super::handlers::queue::{
    AdvanceTokenCommand, AdvanceTokenHandler, GenerateTokenCommand, GenerateTokenHandler,
    GetQueueStatsHandler, GetQueueStatsQuery, RemoveTokenCommand, RemoveTokenHandler,
};
use super::payment_sessions::{PaymentConfirmation, PaymentSession};

pub struct VisitEngine {
    ctx: Arc<VisitContext>,
}

impl VisitEngine {
    pub fn new(ctx: VisitContext) -> Self {
        Self::from_context(Arc::new(ctx))
    }

    /// Engine over a context that other components already share.
    pub fn from_context(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<VisitContext> {
        &self.ctx
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Appointments
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn book_appointment(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time_slot: impl Into<String>,
    ) -> Result<BookAppointmentResult, VisitError> {
        BookAppointmentHandler::new(self.ctx.clone())
            .handle(BookAppointmentCommand {
                patient_id,
                doctor_id,
                date,
                time_slot: time_slot.into(),
            })
            .await
    }

    pub async fn list_available_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<ListAvailableSlotsResult, VisitError> {
        ListAvailableSlotsHandler::new(self.ctx.clone())
            .handle(ListAvailableSlotsQuery { doctor_id, date })
            .await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: AppointmentId,
        patient_id: Option<PatientId>,
    ) -> Result<Appointment, VisitError> {
        GetAppointmentHandler::new(self.ctx.clone())
            .handle(GetAppointmentQuery {
                appointment_id,
                patient_id,
            })
            .await
    }

    /// `patient_id` is `None` when staff cancel on the patient's behalf.
    pub async fn cancel_appointment(
        &self,
        appointment_id: AppointmentId,
        patient_id: Option<PatientId>,
    ) -> Result<Appointment, VisitError> {
        CancelAppointmentHandler::new(self.ctx.clone())
            .handle(CancelAppointmentCommand {
                appointment_id,
                patient_id,
            })
            .await
    }

    pub async fn expire_stale_holds(&self) -> Result<HoldSweepReport, VisitError> {
        ExpireStaleHoldsHandler::new(self.ctx.clone()).handle().await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payments
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn initiate_payment(
        &self,
        appointment_id: AppointmentId,
        patient_id: Option<PatientId>,
    ) -> Result<PaymentSession, VisitError> {
        InitiatePaymentHandler::new(self.ctx.clone())
            .handle(InitiatePaymentCommand {
                appointment_id,
                patient_id,
            })
            .await
    }

    pub async fn initiate_invoice_payment(
        &self,
        invoice_id: InvoiceId,
        amount_minor: i64,
    ) -> Result<PaymentSession, VisitError> {
        InitiateInvoicePaymentHandler::new(self.ctx.clone())
            .handle(InitiateInvoicePaymentCommand {
                invoice_id,
                amount_minor,
            })
            .await
    }

    pub async fn confirm_payment(
        &self,
        payment_id: PaymentId,
        result: GatewayResult,
    ) -> Result<PaymentConfirmation, VisitError> {
        ConfirmPaymentHandler::new(self.ctx.clone())
            .handle(ConfirmPaymentCommand { payment_id, result })
            .await
    }

    pub async fn reconcile_payments(&self) -> Result<ReconciliationReport, VisitError> {
        ReconcilePaymentsHandler::new(self.ctx.clone()).handle().await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Queue
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn generate_token(
        &self,
        patient_id: PatientId,
        department_id: DepartmentId,
    ) -> Result<Token, VisitError> {
        GenerateTokenHandler::new(self.ctx.clone())
            .handle(GenerateTokenCommand {
                patient_id,
                department_id,
            })
            .await
    }

    pub async fn advance_token(
        &self,
        token_id: TokenId,
        status: impl Into<String>,
    ) -> Result<Token, VisitError> {
        AdvanceTokenHandler::new(self.ctx.clone())
            .handle(AdvanceTokenCommand {
                token_id,
                status: status.into(),
            })
            .await
    }

    pub async fn cancel_token(&self, token_id: TokenId) -> Result<Token, VisitError> {
        AdvanceTokenHandler::new(self.ctx.clone())
            .handle(AdvanceTokenCommand::cancel(token_id))
            .await
    }

    pub async fn remove_token(
        &self,
        token_id: TokenId,
        staff_id: StaffId,
        admin_override: bool,
    ) -> Result<Token, VisitError> {
        RemoveTokenHandler::new(self.ctx.clone())
            .handle(RemoveTokenCommand {
                token_id,
                staff_id,
                admin_override,
            })
            .await
    }

    /// `date` defaults to the clinic's current day.
    pub async fn queue_stats(
        &self,
        department_id: DepartmentId,
        date: Option<NaiveDate>,
    ) -> Result<QueueStats, VisitError> {
        GetQueueStatsHandler::new(self.ctx.clone())
            .handle(GetQueueStatsQuery {
                department_id,
                date,
            })
            .await
    }
}

//! Axum router configuration for the visit endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    advance_token, book_appointment, cancel_appointment, cancel_token, confirm_payment,
    generate_token, get_appointment, health, initiate_invoice_payment, initiate_payment,
    list_available_slots, queue_stats, remove_token, VisitAppState,
};

/// Patient-facing appointment and payment routes.
///
/// # Routes
/// - `GET /doctors/:doctor_id/slots?date=` - Slot availability for a day
/// - `POST /appointments` - Book (hold) a slot
/// - `GET /appointments/:id` - Appointment details
/// - `POST /appointments/:id/payment` - Start or resume checkout
/// - `POST /appointments/:id/cancel` - Cancel and release the slot
/// - `POST /payments/:id/confirm` - Apply the checkout widget's result
/// - `POST /invoices/:id/payment` - Start or resume an invoice checkout
pub fn appointment_routes() -> Router<VisitAppState> {
    Router::new()
        .route("/doctors/:doctor_id/slots", get(list_available_slots))
        .route("/appointments", post(book_appointment))
        .route("/appointments/:id", get(get_appointment))
        .route("/appointments/:id/payment", post(initiate_payment))
        .route("/appointments/:id/cancel", post(cancel_appointment))
        .route("/payments/:id/confirm", post(confirm_payment))
        .route("/invoices/:id/payment", post(initiate_invoice_payment))
}

/// Staff-facing walk-in queue routes.
///
/// # Routes
/// - `POST /queue/tokens` - Issue the next token
/// - `POST /queue/tokens/:id/advance` - Move a token along
/// - `POST /queue/tokens/:id/cancel` - Cancel a token
/// - `DELETE /queue/tokens/:id` - Remove a token outright
/// - `GET /queue/:department_id/stats?date=` - Counts for a day
pub fn queue_routes() -> Router<VisitAppState> {
    Router::new()
        .route("/queue/tokens", post(generate_token))
        .route("/queue/tokens/:id", delete(remove_token))
        .route("/queue/tokens/:id/advance", post(advance_token))
        .route("/queue/tokens/:id/cancel", post(cancel_token))
        .route("/queue/:department_id/stats", get(queue_stats))
}

/// Complete visit API, mounted under `/api`, plus `/health`.
///
/// # Example
///
/// ```ignore
/// let app = visit_router().with_state(VisitAppState::new(engine));
/// axum::serve(listener, app).await?;
/// ```
pub fn visit_router() -> Router<VisitAppState> {
    Router::new()
        .nest("/api", appointment_routes().merge(queue_routes()))
        .route("/health", get(health))
}

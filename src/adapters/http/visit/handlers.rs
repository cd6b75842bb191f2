//! HTTP handlers for the visit endpoints.
//!
//! Thin translation between axum and `VisitEngine`: parse ids, call the
//! engine, map the result to a DTO, map `VisitError` to a status code.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Json, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::VisitEngine;
use crate::domain::foundation::{
    AppointmentId, DepartmentId, DoctorId, InvoiceId, PatientId, PaymentId, StaffId, TokenId,
};
use crate::domain::VisitError;
use crate::ports::GatewayResult;

use super::dto::{
    AdvanceTokenRequest, AppointmentResponse, BookAppointmentRequest, BookingResponse,
    ErrorResponse, GenerateTokenRequest, HealthResponse, InvoicePaymentRequest,
    RemoveTokenQuery, SlotsQuery, SlotsResponse, StatsQuery, TokenResponse,
};

pub const PATIENT_HEADER: &str = "X-Patient-Id";
pub const STAFF_HEADER: &str = "X-Staff-Id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct VisitAppState {
    pub engine: Arc<VisitEngine>,
}

impl VisitAppState {
    pub fn new(engine: Arc<VisitEngine>) -> Self {
        Self { engine }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller Identity (set by the upstream identity gateway)
// ════════════════════════════════════════════════════════════════════════════════

/// Rejection for requests without a usable identity header.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

/// `None` if the header is absent; a present but unusable value is rejected.
fn header_id<T, E>(
    parts: &Parts,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Option<Result<T, AuthenticationRequired>> {
    parts.headers.get(name).map(|value| {
        value
            .to_str()
            .ok()
            .and_then(|s| parse(s).ok())
            .ok_or(AuthenticationRequired)
    })
}

/// Who is calling: a patient acting on their own records, or clinic staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Patient(PatientId),
    Staff(StaffId),
}

impl Caller {
    /// Ownership filter to apply; staff see every record.
    pub fn patient_scope(&self) -> Option<PatientId> {
        match self {
            Caller::Patient(id) => Some(id.clone()),
            Caller::Staff(_) => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(patient) = header_id(parts, PATIENT_HEADER, |s| PatientId::new(s)) {
            return patient.map(Caller::Patient);
        }
        if let Some(staff) = header_id(parts, STAFF_HEADER, |s| StaffId::new(s)) {
            return staff.map(Caller::Staff);
        }
        Err(AuthenticationRequired)
    }
}

/// A caller that must be a patient.
#[derive(Debug, Clone)]
pub struct PatientIdentity(pub PatientId);

#[async_trait]
impl<S> FromRequestParts<S> for PatientIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_id(parts, PATIENT_HEADER, |s| PatientId::new(s))
            .unwrap_or(Err(AuthenticationRequired))
            .map(PatientIdentity)
    }
}

/// A caller that must be clinic staff.
#[derive(Debug, Clone)]
pub struct StaffIdentity(pub StaffId);

#[async_trait]
impl<S> FromRequestParts<S> for StaffIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_id(parts, STAFF_HEADER, |s| StaffId::new(s))
            .unwrap_or(Err(AuthenticationRequired))
            .map(StaffIdentity)
    }
}

fn parse_uuid_id<T: FromStr>(field: &str, raw: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ApiError(VisitError::validation(field, e.to_string())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Appointments
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/doctors/:doctor_id/slots?date=
pub async fn list_available_slots(
    State(state): State<VisitAppState>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let doctor_id = DoctorId::new(doctor_id).map_err(VisitError::from)?;
    let result = state
        .engine
        .list_available_slots(doctor_id, query.date)
        .await?;
    Ok(Json(SlotsResponse::from(&result)))
}

/// POST /api/appointments
pub async fn book_appointment(
    State(state): State<VisitAppState>,
    PatientIdentity(patient_id): PatientIdentity,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doctor_id = DoctorId::new(request.doctor_id).map_err(VisitError::from)?;
    let result = state
        .engine
        .book_appointment(patient_id, doctor_id, request.date, request.time_slot)
        .await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&result))))
}

/// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<VisitAppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AppointmentId = parse_uuid_id("appointment_id", &id)?;
    let appointment = state
        .engine
        .get_appointment(id, caller.patient_scope())
        .await?;
    Ok(Json(AppointmentResponse::from(&appointment)))
}

/// POST /api/appointments/:id/payment
pub async fn initiate_payment(
    State(state): State<VisitAppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AppointmentId = parse_uuid_id("appointment_id", &id)?;
    let session = state
        .engine
        .initiate_payment(id, caller.patient_scope())
        .await?;
    Ok(Json(session))
}

/// POST /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<VisitAppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AppointmentId = parse_uuid_id("appointment_id", &id)?;
    let appointment = state
        .engine
        .cancel_appointment(id, caller.patient_scope())
        .await?;
    Ok(Json(AppointmentResponse::from(&appointment)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/:id/confirm
///
/// Unauthenticated: the gateway signature is the proof.
pub async fn confirm_payment(
    State(state): State<VisitAppState>,
    Path(id): Path<String>,
    Json(result): Json<GatewayResult>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PaymentId = parse_uuid_id("payment_id", &id)?;
    let confirmation = state.engine.confirm_payment(id, result).await?;
    Ok(Json(confirmation))
}

/// POST /api/invoices/:id/payment
pub async fn initiate_invoice_payment(
    State(state): State<VisitAppState>,
    _caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<InvoicePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice_id = InvoiceId::new(id).map_err(VisitError::from)?;
    let session = state
        .engine
        .initiate_invoice_payment(invoice_id, request.amount_minor)
        .await?;
    Ok(Json(session))
}

// ════════════════════════════════════════════════════════════════════════════════
// Queue
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/queue/tokens
pub async fn generate_token(
    State(state): State<VisitAppState>,
    _staff: StaffIdentity,
    Json(request): Json<GenerateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patient_id = PatientId::new(request.patient_id).map_err(VisitError::from)?;
    let department_id = DepartmentId::new(request.department_id).map_err(VisitError::from)?;
    let token = state.engine.generate_token(patient_id, department_id).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse::from(&token))))
}

/// POST /api/queue/tokens/:id/advance
pub async fn advance_token(
    State(state): State<VisitAppState>,
    _staff: StaffIdentity,
    Path(id): Path<String>,
    Json(request): Json<AdvanceTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TokenId = parse_uuid_id("token_id", &id)?;
    let token = state.engine.advance_token(id, request.status).await?;
    Ok(Json(TokenResponse::from(&token)))
}

/// POST /api/queue/tokens/:id/cancel
pub async fn cancel_token(
    State(state): State<VisitAppState>,
    _staff: StaffIdentity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TokenId = parse_uuid_id("token_id", &id)?;
    let token = state.engine.cancel_token(id).await?;
    Ok(Json(TokenResponse::from(&token)))
}

/// DELETE /api/queue/tokens/:id?admin_override=
pub async fn remove_token(
    State(state): State<VisitAppState>,
    StaffIdentity(staff_id): StaffIdentity,
    Path(id): Path<String>,
    Query(query): Query<RemoveTokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TokenId = parse_uuid_id("token_id", &id)?;
    let token = state
        .engine
        .remove_token(id, staff_id, query.admin_override)
        .await?;
    Ok(Json(TokenResponse::from(&token)))
}

/// GET /api/queue/:department_id/stats?date=
pub async fn queue_stats(
    State(state): State<VisitAppState>,
    _staff: StaffIdentity,
    Path(department_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let department_id = DepartmentId::new(department_id).map_err(VisitError::from)?;
    let stats = state.engine.queue_stats(department_id, query.date).await?;
    Ok(Json(stats))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper for converting engine errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub VisitError);

impl From<VisitError> for ApiError {
    fn from(err: VisitError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            VisitError::SlotUnavailable { .. }
            | VisitError::InvalidState { .. }
            | VisitError::InvalidTransition { .. } => StatusCode::CONFLICT,
            VisitError::NotFound { .. } => StatusCode::NOT_FOUND,
            VisitError::VerificationFailed { .. } => StatusCode::UNAUTHORIZED,
            VisitError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            VisitError::GatewayUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            VisitError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code().to_string();

        let body = match &self.0 {
            VisitError::ValidationFailed { field, .. } => ErrorResponse::with_details(
                code,
                self.0.to_string(),
                serde_json::json!({ "field": field }),
            ),
            VisitError::InvalidTransition { from, to } => ErrorResponse::with_details(
                code,
                self.0.to_string(),
                serde_json::json!({ "from": from, "to": to }),
            ),
            // Store failures stay in the logs.
            VisitError::Infrastructure(message) => {
                tracing::error!(error = %message, "Request failed with internal error");
                ErrorResponse::new(code, "Internal server error")
            }
            other => ErrorResponse::new(code, other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn patient_header_wins_over_staff_header() {
        let mut parts = parts(&[(PATIENT_HEADER, "P-1"), (STAFF_HEADER, "S-1")]);
        let caller = Caller::from_request_parts(&mut parts, &()).await.ok().unwrap();
        assert_eq!(caller, Caller::Patient(PatientId::new("P-1").unwrap()));
        assert!(caller.patient_scope().is_some());
    }

    #[tokio::test]
    async fn staff_caller_has_no_patient_scope() {
        let mut parts = parts(&[(STAFF_HEADER, "S-1")]);
        let caller = Caller::from_request_parts(&mut parts, &()).await.ok().unwrap();
        assert_eq!(caller.patient_scope(), None);
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let mut parts = parts(&[]);
        assert!(Caller::from_request_parts(&mut parts, &()).await.is_err());
        assert!(StaffIdentity::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn blank_header_is_rejected_not_ignored() {
        let mut parts = parts(&[(PATIENT_HEADER, ""), (STAFF_HEADER, "S-1")]);
        assert!(Caller::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[test]
    fn error_statuses_follow_the_failure_kind() {
        let cases = [
            (VisitError::slot_unavailable("D101 2025-01-10 10:00"), StatusCode::CONFLICT),
            (VisitError::invalid_state("not pending"), StatusCode::CONFLICT),
            (
                VisitError::InvalidTransition {
                    from: "completed".into(),
                    to: "waiting".into(),
                },
                StatusCode::CONFLICT,
            ),
            (VisitError::not_found("appointment", "x"), StatusCode::NOT_FOUND),
            (VisitError::verification_failed("bad signature"), StatusCode::UNAUTHORIZED),
            (VisitError::validation("time_slot", "bad"), StatusCode::BAD_REQUEST),
            (VisitError::gateway_unavailable("timeout"), StatusCode::SERVICE_UNAVAILABLE),
            (VisitError::infrastructure("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn malformed_uuid_is_a_validation_error() {
        let err = parse_uuid_id::<AppointmentId>("appointment_id", "nope").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

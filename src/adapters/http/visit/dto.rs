//! HTTP DTOs for the visit endpoints.
//!
//! Requests carry raw strings; the handlers parse them into domain ids so
//! that a malformed value becomes a 400 rather than a JSON rejection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::{BookAppointmentResult, ListAvailableSlotsResult};
use crate::domain::appointment::{Appointment, AppointmentStatus, CancellationReason};
use crate::domain::foundation::{AppointmentId, PaymentId, Timestamp, TokenId};
use crate::domain::queue::{Token, TokenStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub date: NaiveDate,
    /// Slot start as `HH:MM`.
    pub time_slot: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePaymentRequest {
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateTokenRequest {
    pub patient_id: String,
    pub department_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvanceTokenRequest {
    /// Target status, e.g. `in_progress`.
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveTokenQuery {
    #[serde(default)]
    pub admin_override: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    /// Defaults to today in clinic time.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentResponse {
    pub id: AppointmentId,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<CancellationReason>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,
}

impl From<&Appointment> for AppointmentResponse {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_id: appointment.patient_id.to_string(),
            doctor_id: appointment.doctor_id.to_string(),
            date: appointment.date,
            time_slot: appointment.time_slot.to_string(),
            status: appointment.status,
            payment_id: appointment.payment_id,
            cancellation_reason: appointment.cancellation_reason,
            created_at: appointment.created_at,
            cancelled_at: appointment.cancelled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub appointment: AppointmentResponse,
    /// After this instant an unpaid hold lapses.
    pub hold_expires_at: Timestamp,
}

impl From<&BookAppointmentResult> for BookingResponse {
    fn from(result: &BookAppointmentResult) -> Self {
        Self {
            appointment: AppointmentResponse::from(&result.appointment),
            hold_expires_at: result.hold_expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub time_slot: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotsResponse {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub slots: Vec<SlotView>,
}

impl From<&ListAvailableSlotsResult> for SlotsResponse {
    fn from(result: &ListAvailableSlotsResult) -> Self {
        Self {
            doctor_id: result.doctor_id.to_string(),
            date: result.date,
            slots: result
                .slots
                .iter()
                .map(|s| SlotView {
                    time_slot: s.slot.to_string(),
                    available: s.available,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub id: TokenId,
    pub patient_id: String,
    pub department_id: String,
    pub queue_date: NaiveDate,
    pub queue_number: u32,
    pub status: TokenStatus,
    pub issued_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Token> for TokenResponse {
    fn from(token: &Token) -> Self {
        Self {
            id: token.id,
            patient_id: token.patient_id.to_string(),
            department_id: token.department_id.to_string(),
            queue_date: token.queue_date,
            queue_number: token.queue_number,
            status: token.status,
            issued_at: token.issued_at,
            updated_at: token.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DoctorId, PatientId};

    #[test]
    fn appointment_response_omits_unset_fields() {
        let appointment = Appointment::book(
            PatientId::new("P-1").unwrap(),
            DoctorId::new("D101").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "10:00".parse().unwrap(),
            Timestamp::now(),
        );
        let json = serde_json::to_value(AppointmentResponse::from(&appointment)).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["time_slot"], "10:00");
        assert!(json.get("payment_id").is_none());
        assert!(json.get("cancellation_reason").is_none());
    }

    #[test]
    fn remove_query_defaults_to_no_override() {
        let query: RemoveTokenQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.admin_override);
    }

    #[test]
    fn error_response_serializes_without_details_when_none() {
        let json = serde_json::to_string(&ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert!(!json.contains("details"));
    }
}

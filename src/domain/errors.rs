//! Engine-level error type.
//!
//! Every engine operation returns `Result<_, VisitError>`. Port failures
//! arrive as `DomainError` and are folded in by code.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | SlotUnavailable | 409 |
//! | InvalidState | 409 |
//! | InvalidTransition | 409 |
//! | NotFound | 404 |
//! | VerificationFailed | 401 |
//! | ValidationFailed | 400 |
//! | GatewayUnavailable | 503 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{
    DomainError, ErrorCode, TransitionError, UnknownVariant, ValidationError,
};

/// Typed failure of a visit lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisitError {
    #[error("Slot {slot} is not available")]
    SlotUnavailable { slot: String },

    #[error("{message}")]
    InvalidState { message: String },

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Payment verification failed: {reason}")]
    VerificationFailed { reason: String },

    #[error("Payment gateway unavailable: {message}")]
    GatewayUnavailable { message: String },

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Internal error: {0}")]
    Infrastructure(String),
}

impl VisitError {
    pub fn slot_unavailable(slot: impl ToString) -> Self {
        VisitError::SlotUnavailable {
            slot: slot.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        VisitError::InvalidState {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        VisitError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn verification_failed(reason: impl Into<String>) -> Self {
        VisitError::VerificationFailed {
            reason: reason.into(),
        }
    }

    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        VisitError::GatewayUnavailable {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        VisitError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        VisitError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            VisitError::SlotUnavailable { .. } => ErrorCode::SlotUnavailable,
            VisitError::InvalidState { .. } => ErrorCode::InvalidState,
            VisitError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            VisitError::NotFound { entity, .. } => match *entity {
                "appointment" => ErrorCode::AppointmentNotFound,
                "payment" => ErrorCode::PaymentNotFound,
                "token" => ErrorCode::TokenNotFound,
                _ => ErrorCode::NotFound,
            },
            VisitError::VerificationFailed { .. } => ErrorCode::VerificationFailed,
            VisitError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            VisitError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            VisitError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VisitError::GatewayUnavailable { .. } | VisitError::Infrastructure(_)
        )
    }
}

impl From<DomainError> for VisitError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| err.details.get(key).cloned().unwrap_or_default();
        match err.code {
            ErrorCode::ValidationFailed => VisitError::ValidationFailed {
                field: detail("field"),
                message: err.message.clone(),
            },
            ErrorCode::NotFound => VisitError::not_found("resource", detail("id")),
            ErrorCode::AppointmentNotFound => VisitError::not_found("appointment", detail("id")),
            ErrorCode::PaymentNotFound => VisitError::not_found("payment", detail("id")),
            ErrorCode::TokenNotFound => VisitError::not_found("token", detail("id")),
            ErrorCode::SlotUnavailable => VisitError::slot_unavailable(detail("slot")),
            ErrorCode::InvalidState
            | ErrorCode::ConcurrentModification
            | ErrorCode::DuplicatePayment => VisitError::invalid_state(err.message.clone()),
            ErrorCode::InvalidStateTransition => VisitError::InvalidTransition {
                from: detail("from"),
                to: detail("to"),
            },
            ErrorCode::VerificationFailed => VisitError::verification_failed(err.message.clone()),
            ErrorCode::GatewayUnavailable => VisitError::gateway_unavailable(err.message.clone()),
            ErrorCode::DatabaseError | ErrorCode::CacheError | ErrorCode::InternalError => {
                VisitError::Infrastructure(err.message.clone())
            }
        }
    }
}

impl From<ValidationError> for VisitError {
    fn from(err: ValidationError) -> Self {
        VisitError::validation(err.field().to_string(), err.to_string())
    }
}

/// Unrecognised status strings are a state problem, not a format problem.
impl From<UnknownVariant> for VisitError {
    fn from(err: UnknownVariant) -> Self {
        VisitError::invalid_state(err.to_string())
    }
}

impl From<TransitionError> for VisitError {
    fn from(err: TransitionError) -> Self {
        VisitError::InvalidTransition {
            from: err.from,
            to: err.to,
        }
    }
}

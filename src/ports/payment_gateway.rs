//! Payment gateway port.
//!
//! The gateway is a black box that opens orders, signs checkout results, and
//! reports order status. The engine never retries a gateway call on its own.
//!
//! # Design
//!
//! - **Idempotent open**: `open` carries the payment id as idempotency key,
//!   so re-opening after a crash yields the same order
//! - **Verification is local**: `verify` checks the gateway's signature
//!   without a network round-trip

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Money, PaymentId};
use crate::domain::payment::GatewaySession;
use crate::domain::VisitError;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name stored on each payment (e.g. `razorpay`).
    fn provider(&self) -> &str;

    /// Opens an order and returns the checkout payload for the client.
    async fn open(&self, request: OpenOrderRequest) -> Result<GatewaySession, GatewayError>;

    /// Checks the signature and attribution of a checkout result.
    async fn verify(&self, result: &GatewayResult) -> Result<VerifiedPayment, GatewayError>;

    /// Current state of an order, for reconciliation.
    async fn fetch_status(&self, order_ref: &str) -> Result<GatewayOrderStatus, GatewayError>;
}

/// Request to open a gateway order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrderRequest {
    pub amount: Money,
    /// Human-readable reference shown in the gateway dashboard (`appointment:<id>`).
    pub subject_ref: String,
    /// Same value on every attempt for one payment.
    pub idempotency_key: String,
}

impl OpenOrderRequest {
    pub fn for_payment(payment_id: PaymentId, amount: Money, subject_ref: impl Into<String>) -> Self {
        Self {
            amount,
            subject_ref: subject_ref.into(),
            idempotency_key: payment_id.to_string(),
        }
    }
}

/// What the client's checkout widget posts back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResult {
    pub order_ref: String,
    #[serde(default)]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Set when the widget reports a failed attempt.
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl GatewayResult {
    /// True when the result claims a capture rather than reporting a failure.
    pub fn claims_capture(&self) -> bool {
        self.error_code.is_none() && self.signature.is_some()
    }
}

/// A checkout result after verification.
///
/// `success == true` is backed by a valid signature. `success == false`
/// echoes an unsigned failure report from the widget and must be confirmed
/// with [`PaymentGateway::fetch_status`] before anything is settled on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub order_ref: String,
    pub payment_ref: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
}

/// Order state reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GatewayOrderStatus {
    /// Created, no capture yet.
    Open,
    Captured { payment_ref: String },
    Failed { reason: String },
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::VerificationFailed, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::VerificationFailed => ErrorCode::VerificationFailed,
            GatewayErrorCode::InvalidRequest => ErrorCode::ValidationFailed,
            _ => ErrorCode::GatewayUnavailable,
        };
        DomainError::new(code, err.message)
    }
}

impl From<GatewayError> for VisitError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::VerificationFailed => VisitError::verification_failed(err.message),
            GatewayErrorCode::InvalidRequest => VisitError::validation("gateway", err.message),
            _ => VisitError::gateway_unavailable(err.message),
        }
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    NetworkError,
    Timeout,
    AuthenticationError,
    InvalidRequest,
    NotFound,
    VerificationFailed,
    /// 5xx or malformed response from the provider.
    ProviderError,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::Timeout | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::VerificationFailed => "verification_failed",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

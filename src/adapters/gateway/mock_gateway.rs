//! In-process payment gateway.
//!
//! Used by tests and by local runs with `gateway.provider = "mock"`.
//! Supports:
//! - Idempotent order creation keyed by the payment id
//! - Signing checkout results the way the real widget would
//! - Scripted order status for reconciliation
//! - Error injection and call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::payment::GatewaySession;
use crate::ports::{
    GatewayError, GatewayOrderStatus, GatewayResult, OpenOrderRequest, PaymentGateway,
    VerifiedPayment,
};

use super::signature::{sign_checkout, verify_checkout_result};

/// Signing secret of the mock gateway.
pub const MOCK_KEY_SECRET: &str = "mock_key_secret";

const MOCK_PROVIDER: &str = "mock";
const MOCK_KEY_ID: &str = "mock_key_id";

/// Recorded gateway call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default)]
struct MockState {
    /// Orders by idempotency key.
    orders: HashMap<String, GatewaySession>,
    /// Scripted status by order ref; unscripted known orders are open.
    statuses: HashMap<String, GatewayOrderStatus>,
    next_error: Option<GatewayError>,
    method_errors: HashMap<String, GatewayError>,
    call_log: Vec<GatewayCall>,
    sequence: u64,
}

/// Mock gateway. Clones share state.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// let session = engine.initiate_payment(..).await?;
/// let result = gateway.sign_success(&session.payload.unwrap().order_ref, "pay_1");
/// engine.confirm_payment(session.payment_id, result).await?;
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
    secret: SecretString,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState::default())),
            secret: SecretString::new(MOCK_KEY_SECRET.to_string()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Simulation
    // ════════════════════════════════════════════════════════════════════════════

    /// A correctly signed successful checkout result.
    pub fn sign_success(&self, order_ref: &str, payment_ref: &str) -> GatewayResult {
        GatewayResult {
            order_ref: order_ref.to_string(),
            payment_ref: Some(payment_ref.to_string()),
            signature: sign_checkout(&self.secret, order_ref, payment_ref).ok(),
            error_code: None,
            error_description: None,
        }
    }

    /// An unsigned failure report, as the widget sends on decline.
    pub fn failure_report(&self, order_ref: &str, description: &str) -> GatewayResult {
        GatewayResult {
            order_ref: order_ref.to_string(),
            payment_ref: None,
            signature: None,
            error_code: Some("BAD_REQUEST_ERROR".to_string()),
            error_description: Some(description.to_string()),
        }
    }

    /// Scripts what `fetch_status` reports for an order.
    pub fn set_order_status(&self, order_ref: &str, status: GatewayOrderStatus) {
        self.state()
            .statuses
            .insert(order_ref.to_string(), status);
    }

    /// Number of distinct orders opened.
    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Injection
    // ════════════════════════════════════════════════════════════════════════════

    /// Error returned by the next call to any method.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Error returned by every call to `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(GatewayCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider(&self) -> &str {
        MOCK_PROVIDER
    }

    async fn open(&self, request: OpenOrderRequest) -> Result<GatewaySession, GatewayError> {
        self.record_call(
            "open",
            vec![request.idempotency_key.clone(), request.subject_ref.clone()],
        );
        self.check_error("open")?;

        let mut state = self.state();
        if let Some(existing) = state.orders.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        state.sequence += 1;
        let session = GatewaySession {
            provider: MOCK_PROVIDER.to_string(),
            order_ref: format!("order_mock_{:06}", state.sequence),
            key_id: MOCK_KEY_ID.to_string(),
            amount_minor: request.amount.amount_minor(),
            currency: request.amount.currency().to_string(),
            checkout_url: None,
        };
        state
            .orders
            .insert(request.idempotency_key.clone(), session.clone());
        Ok(session)
    }

    async fn verify(&self, result: &GatewayResult) -> Result<VerifiedPayment, GatewayError> {
        self.record_call("verify", vec![result.order_ref.clone()]);
        self.check_error("verify")?;
        verify_checkout_result(&self.secret, result)
    }

    async fn fetch_status(&self, order_ref: &str) -> Result<GatewayOrderStatus, GatewayError> {
        self.record_call("fetch_status", vec![order_ref.to_string()]);
        self.check_error("fetch_status")?;

        let state = self.state();
        if let Some(status) = state.statuses.get(order_ref) {
            return Ok(status.clone());
        }
        if state.orders.values().any(|o| o.order_ref == order_ref) {
            return Ok(GatewayOrderStatus::Open);
        }
        Err(GatewayError::not_found(&format!("order {}", order_ref)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Money, PaymentId};
    use crate::ports::GatewayErrorCode;

    fn request(payment_id: PaymentId) -> OpenOrderRequest {
        OpenOrderRequest::for_payment(
            payment_id,
            Money::new(50_000, "INR").unwrap(),
            "appointment:x",
        )
    }

    #[tokio::test]
    async fn open_is_idempotent_per_payment() {
        let gateway = MockPaymentGateway::new();
        let payment_id = PaymentId::new();

        let first = gateway.open(request(payment_id)).await.unwrap();
        let second = gateway.open(request(payment_id)).await.unwrap();
        let other = gateway.open(request(PaymentId::new())).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first.order_ref, other.order_ref);
        assert_eq!(gateway.order_count(), 2);
        assert_eq!(gateway.call_count("open"), 3);
    }

    #[tokio::test]
    async fn signed_success_verifies() {
        let gateway = MockPaymentGateway::new();
        let verified = gateway
            .verify(&gateway.sign_success("order_mock_000001", "pay_1"))
            .await
            .unwrap();
        assert!(verified.success);
    }

    #[tokio::test]
    async fn tampered_result_fails_verification() {
        let gateway = MockPaymentGateway::new();
        let mut result = gateway.sign_success("order_mock_000001", "pay_1");
        result.payment_ref = Some("pay_2".to_string());
        let err = gateway.verify(&result).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::VerificationFailed);
    }

    #[tokio::test]
    async fn fetch_status_defaults_to_open_for_known_orders() {
        let gateway = MockPaymentGateway::new();
        let session = gateway.open(request(PaymentId::new())).await.unwrap();

        assert_eq!(
            gateway.fetch_status(&session.order_ref).await.unwrap(),
            GatewayOrderStatus::Open
        );

        gateway.set_order_status(
            &session.order_ref,
            GatewayOrderStatus::Captured {
                payment_ref: "pay_9".to_string(),
            },
        );
        assert!(matches!(
            gateway.fetch_status(&session.order_ref).await.unwrap(),
            GatewayOrderStatus::Captured { .. }
        ));
        assert!(gateway.fetch_status("order_unknown").await.is_err());
    }

    #[tokio::test]
    async fn method_errors_persist_until_cleared() {
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("open", GatewayError::timeout("slow"));

        assert!(gateway.open(request(PaymentId::new())).await.is_err());
        assert!(gateway.open(request(PaymentId::new())).await.is_err());

        gateway.clear_errors();
        assert!(gateway.open(request(PaymentId::new())).await.is_ok());
    }
}

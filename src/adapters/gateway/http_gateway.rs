//! Hosted-checkout gateway over HTTPS.
//!
//! Speaks a Razorpay-style orders API:
//!
//! | Call | Request |
//! |------|---------|
//! | `open` | `POST /v1/orders` |
//! | `fetch_status` | `GET /v1/orders/{order_ref}/payments` |
//!
//! Requests authenticate with HTTP basic auth (`key_id:key_secret`).
//! Checkout results are verified locally, see [`super::signature`].
//!
//! # Security
//!
//! - Key secret held in `secrecy::SecretString`, never logged
//! - Signature comparison is constant-time

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::payment::GatewaySession;
use crate::ports::{
    GatewayError, GatewayErrorCode, GatewayOrderStatus, GatewayResult, OpenOrderRequest,
    PaymentGateway, VerifiedPayment,
};

use super::signature::verify_checkout_result;

/// Connection settings for the hosted gateway.
#[derive(Clone)]
pub struct HttpGatewayConfig {
    provider: String,
    key_id: String,
    key_secret: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(
        provider: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: SecretString,
    ) -> Self {
        Self {
            provider: provider.into(),
            key_id: key_id.into(),
            key_secret,
            api_base_url: "https://api.razorpay.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing or a regional endpoint).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gateway adapter backed by `reqwest`.
pub struct HttpPaymentGateway {
    config: HttpGatewayConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::provider(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn error_from_response(response: reqwest::Response, call: &str) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, error = %body, call, "Gateway call failed");
        let code = match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                GatewayErrorCode::AuthenticationError
            }
            reqwest::StatusCode::NOT_FOUND => GatewayErrorCode::NotFound,
            s if s.is_client_error() => GatewayErrorCode::InvalidRequest,
            _ => GatewayErrorCode::ProviderError,
        };
        GatewayError::new(code, format!("{} returned {}", call, status))
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout(e.to_string())
    } else {
        GatewayError::network(e.to_string())
    }
}

fn parse_error(e: reqwest::Error) -> GatewayError {
    GatewayError::provider(format!("Failed to parse gateway response: {}", e))
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: OrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotes<'a> {
    subject: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct OrderPayments {
    #[serde(default)]
    items: Vec<OrderPayment>,
}

#[derive(Debug, Deserialize)]
struct OrderPayment {
    id: String,
    status: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Folds an order's payment attempts into one order state.
///
/// Any captured attempt wins. An order whose every attempt failed is
/// failed. Anything else (no attempts yet, authorized, pending) is open.
fn order_status(payments: &[OrderPayment]) -> GatewayOrderStatus {
    if let Some(captured) = payments.iter().find(|p| p.status == "captured") {
        return GatewayOrderStatus::Captured {
            payment_ref: captured.id.clone(),
        };
    }
    match payments.last() {
        Some(last) if payments.iter().all(|p| p.status == "failed") => GatewayOrderStatus::Failed {
            reason: last
                .error_description
                .clone()
                .unwrap_or_else(|| "failed".to_string()),
        },
        _ => GatewayOrderStatus::Open,
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn provider(&self) -> &str {
        &self.config.provider
    }

    async fn open(&self, request: OpenOrderRequest) -> Result<GatewaySession, GatewayError> {
        let body = CreateOrderBody {
            amount: request.amount.amount_minor(),
            currency: request.amount.currency(),
            receipt: &request.idempotency_key,
            notes: OrderNotes {
                subject: &request.subject_ref,
            },
        };

        let response = self
            .http_client
            .post(self.url("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .header("Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, "create_order").await);
        }

        let order: OrderResponse = response.json().await.map_err(parse_error)?;
        tracing::debug!(order_ref = %order.id, receipt = %request.idempotency_key, "Gateway order opened");

        Ok(GatewaySession {
            provider: self.config.provider.clone(),
            order_ref: order.id,
            key_id: self.config.key_id.clone(),
            amount_minor: order.amount,
            currency: order.currency,
            checkout_url: None,
        })
    }

    async fn verify(&self, result: &GatewayResult) -> Result<VerifiedPayment, GatewayError> {
        verify_checkout_result(&self.config.key_secret, result)
    }

    async fn fetch_status(&self, order_ref: &str) -> Result<GatewayOrderStatus, GatewayError> {
        let response = self
            .http_client
            .get(self.url(&format!("/v1/orders/{}/payments", order_ref)))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(&format!("order {}", order_ref)));
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response, "fetch_order_payments").await);
        }

        let payments: OrderPayments = response.json().await.map_err(parse_error)?;
        Ok(order_status(&payments.items))
    }
}

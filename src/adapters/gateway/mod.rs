//! Payment gateway adapters.
//!
//! - `HttpPaymentGateway` - Razorpay-style hosted checkout over HTTPS
//! - `MockPaymentGateway` - In-process gateway for tests and local runs
//!
//! Both verify checkout results with the same HMAC-SHA256 signature scheme.

mod http_gateway;
mod mock_gateway;
mod signature;

pub use http_gateway::{HttpGatewayConfig, HttpPaymentGateway};
pub use mock_gateway::{GatewayCall, MockPaymentGateway, MOCK_KEY_SECRET};
pub use signature::{sign_checkout, verify_checkout_result};

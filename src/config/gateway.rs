//! Payment gateway configuration
//!
//! Credentials for the hosted-checkout gateway plus the reconciliation
//! policy for orders the client never came back for.

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Provider name that selects the in-process mock gateway.
pub const MOCK_PROVIDER: &str = "mock";

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Provider name stored on payments; `mock` selects the in-process gateway
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Gateway API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Public key id handed to the checkout widget
    #[serde(default)]
    pub key_id: String,

    /// Secret used for API auth and result signatures
    pub key_secret: Option<SecretString>,

    /// ISO 4217 currency for all charges
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Initiated payments younger than this are left alone by reconciliation
    #[serde(default = "default_reconcile_grace")]
    pub reconcile_grace_secs: u64,

    /// Orders still open after this long are failed with `gateway_timeout`
    #[serde(default = "default_order_timeout")]
    pub order_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn is_mock(&self) -> bool {
        self.provider == MOCK_PROVIDER
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.is_mock() {
            if *environment == Environment::Production {
                return Err(ValidationError::InvalidGateway(
                    "mock gateway is not allowed in production".to_string(),
                ));
            }
        } else {
            if self.key_id.is_empty() {
                return Err(ValidationError::MissingRequired("GATEWAY__KEY_ID"));
            }
            if self.key_secret.is_none() {
                return Err(ValidationError::MissingRequired("GATEWAY__KEY_SECRET"));
            }
            if *environment == Environment::Production && !self.base_url.starts_with("https://") {
                return Err(ValidationError::GatewayMustBeHttps);
            }
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidGateway(format!(
                "currency '{}' is not an upper-case ISO 4217 code",
                self.currency
            )));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.order_timeout_secs < self.reconcile_grace_secs {
            return Err(ValidationError::InvalidGateway(
                "order_timeout_secs must be at least reconcile_grace_secs".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            key_id: String::new(),
            key_secret: None,
            currency: default_currency(),
            request_timeout_secs: default_request_timeout(),
            reconcile_grace_secs: default_reconcile_grace(),
            order_timeout_secs: default_order_timeout(),
        }
    }
}

fn default_provider() -> String {
    "razorpay".to_string()
}

fn default_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_reconcile_grace() -> u64 {
    15 * 60
}

fn default_order_timeout() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_config() -> GatewayConfig {
        GatewayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: Some(SecretString::new("shh".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_http_config() {
        assert!(http_config().validate(&Environment::Production).is_ok());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let config = GatewayConfig {
            key_secret: None,
            ..http_config()
        };
        assert!(matches!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired("GATEWAY__KEY_SECRET"))
        ));
    }

    #[test]
    fn test_mock_needs_no_credentials_outside_production() {
        let config = GatewayConfig {
            provider: MOCK_PROVIDER.to_string(),
            key_id: String::new(),
            key_secret: None,
            ..http_config()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_production_requires_https() {
        let config = GatewayConfig {
            base_url: "http://gateway.internal".to_string(),
            ..http_config()
        };
        assert!(config.validate(&Environment::Staging).is_ok());
        assert!(matches!(
            config.validate(&Environment::Production),
            Err(ValidationError::GatewayMustBeHttps)
        ));
    }

    #[test]
    fn test_order_timeout_must_cover_grace() {
        let config = GatewayConfig {
            reconcile_grace_secs: 600,
            order_timeout_secs: 300,
            ..http_config()
        };
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_lower_case_currency_rejected() {
        let config = GatewayConfig {
            currency: "inr".to_string(),
            ..http_config()
        };
        assert!(config.validate(&Environment::Development).is_err());
    }
}

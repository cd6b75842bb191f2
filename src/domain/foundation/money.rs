//! Money value object.
//!
//! Amounts are integer minor units (paise, cents) paired with an ISO 4217
//! currency code. Floats never enter the payment path.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Largest single charge accepted (10 million major units).
const MAX_AMOUNT_MINOR: i64 = 1_000_000_000;

/// A positive amount in minor units of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: String,
}

impl Money {
    /// Creates a validated amount.
    ///
    /// The amount must be positive and the currency a three-letter code.
    pub fn new(amount_minor: i64, currency: impl AsRef<str>) -> Result<Self, ValidationError> {
        if !(1..=MAX_AMOUNT_MINOR).contains(&amount_minor) {
            return Err(ValidationError::out_of_range(
                "amount",
                1,
                MAX_AMOUNT_MINOR,
                amount_minor,
            ));
        }
        let currency = currency.as_ref().trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }

    /// Amount in minor units.
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Upper-case currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount_minor / 100,
            self.amount_minor % 100,
            self.currency
        )
    }
}

//! Checkout result signatures.
//!
//! The gateway signs `"{order_ref}|{payment_ref}"` with the merchant's key
//! secret using HMAC-SHA256 and hands the hex digest to the checkout widget.
//! The widget posts it back and we recompute it here.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::{GatewayError, GatewayResult, VerifiedPayment};

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of a checkout result.
pub fn sign_checkout(
    secret: &SecretString,
    order_ref: &str,
    payment_ref: &str,
) -> Result<String, GatewayError> {
    Ok(hex::encode(digest(secret, order_ref, payment_ref)?))
}

/// Checks a checkout result posted back by the widget.
///
/// A success must carry a payment reference and a valid signature. A failure
/// report (`error_code` set) carries no signature; it is passed through with
/// `success == false` as an unconfirmed claim, not as proof of a decline.
pub fn verify_checkout_result(
    secret: &SecretString,
    result: &GatewayResult,
) -> Result<VerifiedPayment, GatewayError> {
    if let Some(code) = &result.error_code {
        return Ok(VerifiedPayment {
            order_ref: result.order_ref.clone(),
            payment_ref: result.payment_ref.clone(),
            success: false,
            failure_reason: Some(
                result
                    .error_description
                    .clone()
                    .unwrap_or_else(|| code.clone()),
            ),
        });
    }

    let payment_ref = result
        .payment_ref
        .as_deref()
        .ok_or_else(|| GatewayError::verification("missing payment reference"))?;
    let provided = result
        .signature
        .as_deref()
        .and_then(|sig| hex::decode(sig.trim()).ok())
        .ok_or_else(|| GatewayError::verification("missing or malformed signature"))?;

    let expected = digest(secret, &result.order_ref, payment_ref)?;
    if expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() != 1 {
        tracing::warn!(
            order_ref = %result.order_ref,
            payment_ref = %payment_ref,
            "Invalid checkout signature"
        );
        return Err(GatewayError::verification("invalid signature"));
    }

    Ok(VerifiedPayment {
        order_ref: result.order_ref.clone(),
        payment_ref: Some(payment_ref.to_string()),
        success: true,
        failure_reason: None,
    })
}

fn digest(secret: &SecretString, order_ref: &str, payment_ref: &str) -> Result<Vec<u8>, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| GatewayError::provider(format!("invalid signing key: {}", e)))?;
    mac.update(order_ref.as_bytes());
    mac.update(b"|");
    mac.update(payment_ref.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

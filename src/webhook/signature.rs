//! Webhook signature verification
//!
//! Deliveries carry a hex HMAC-SHA256 of the raw request body, keyed with a
//! secret shared with the notifier. Verification runs on the exact bytes
//! received, before any parsing, and the comparison is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Verify a hex-encoded HMAC-SHA256 signature over `body`
pub fn verify(secret: &str, body: &[u8], signature: &str) -> Result<(), ApiError> {
    let provided = hex::decode(signature.trim())
        .map_err(|_| ApiError::Unauthorized("Malformed webhook signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Unauthorized("Invalid webhook secret".to_string()))?;
    mac.update(body);

    // verify_slice compares in constant time
    mac.verify_slice(&provided)
        .map_err(|_| ApiError::Unauthorized("Webhook signature mismatch".to_string()))
}

/// Compute the hex signature for `body`; the counterpart of [`verify`]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

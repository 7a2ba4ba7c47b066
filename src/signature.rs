//! Payment webhook authentication.
//!
//! [`verify_signature`] is the only way to obtain a
//! [`VerifiedPaymentEvent`] from raw bytes. It checks a Stripe-style
//! `t=<unix>,v1=<hex>` header: HMAC-SHA256 over `"<t>.<payload>"` with the
//! endpoint secret, compared in constant time, with a bounded timestamp age.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::payment::{RawPaymentEvent, VerifiedPaymentEvent};

type HmacSha256 = Hmac<Sha256>;

/// Oldest accepted timestamp, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Allowed clock skew for timestamps from the future, in seconds.
pub const FUTURE_SKEW_SECS: i64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    /// No webhook secret is configured, so nothing can be authenticated.
    #[error("webhook secret not configured")]
    NotConfigured,

    #[error("signature header is missing or malformed")]
    MalformedHeader,

    #[error("signature timestamp outside tolerance (age {age}s)")]
    StaleTimestamp { age: i64 },

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("signed payload is not a usable event: {0}")]
    MalformedPayload(String),
}

/// Authenticate `payload` against `header` and parse it.
///
/// `now` is the current Unix time, passed in so the check stays pure.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<VerifiedPaymentEvent, SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(sig) = part.strip_prefix("v1=") {
            candidates.push(sig);
        }
    }

    let timestamp_str = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;

    // Header is unauthenticated here; an extreme `t` must not overflow
    let age = now
        .checked_sub(timestamp)
        .ok_or(SignatureError::MalformedHeader)?;
    if age > TIMESTAMP_TOLERANCE_SECS || age < -FUTURE_SKEW_SECS {
        return Err(SignatureError::StaleTimestamp { age });
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp_str.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice compares in constant time
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let raw: RawPaymentEvent = serde_json::from_slice(payload)
        .map_err(|e| SignatureError::MalformedPayload(e.to_string()))?;

    raw.into_verified()
        .ok_or_else(|| SignatureError::MalformedPayload("event object has no id".to_string()))
}

//! Payment provider webhook.
//!
//! The signature is checked before any issuance logic runs. Once an event
//! is authenticated the response is 200 for issued, already-issued, and
//! ignored events alike, so the provider stops redelivering; only store
//! failures answer 500 so it retries.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;

use crate::error::AppError;
use crate::services::issuance_service;
use crate::signature::{SignatureError, verify_signature};
use crate::state::AppState;

/// Header carrying `t=<unix>,v1=<hex>`.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Acknowledgement returned to the payment provider.
///
/// ```json
/// { "received": true, "outcome": "issued" }
/// ```
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

/// Receive a payment event.
///
/// # Responses
///
/// - 200: event handled (`issued`, `already_issued`, or `ignored`)
/// - 400: signature missing, invalid, stale, or payload unusable
/// - 500: license could not be stored; the provider should retry
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let secret = state
        .settings
        .webhook_secret
        .as_deref()
        .ok_or(SignatureError::NotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(SignatureError::MalformedHeader)?;

    let event = verify_signature(&body, signature, secret, chrono::Utc::now().timestamp())?;

    let outcome = issuance_service::on_payment_completed(
        &state.store,
        &state.notifier,
        &state.settings.license_prefix,
        &event,
    )
    .await?;

    Ok(Json(WebhookAck {
        received: true,
        outcome: outcome.label(),
    }))
}

//! Standalone license check used by the extension on start-up.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::models::summary::{VerifyQuery, VerifyResponse};
use crate::services::license_service;
use crate::state::AppState;

/// Check a license key.
///
/// `GET /api/verify?key=SUMM-1A2B3C-4D5E6F-A1B2C3`
///
/// Always answers 200 with `{ "valid": bool }`. Unknown, revoked, missing,
/// and unreadable keys are all just `false`.
pub async fn verify_license(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Json<VerifyResponse> {
    let valid = match query.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => license_service::verify(state.store.as_ref(), key)
            .await
            .is_valid(),
        None => false,
    };

    Json(VerifyResponse { valid })
}

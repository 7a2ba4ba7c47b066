//! License-gated summarization endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::error::AppError;
use crate::models::summary::{SummarizeRequest, SummarizeResponse};
use crate::services::summary_service;
use crate::state::AppState;

/// Summarize page text for a licensed user.
///
/// # Request Body
///
/// ```json
/// {
///   "licenseKey": "SUMM-1A2B3C-4D5E6F-A1B2C3",
///   "title": "Optional page title",
///   "text": "Page text..."
/// }
/// ```
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "result": {
///     "headline": "What the page is about",
///     "bullets": ["...", "...", "..."],
///     "readTime": "4 min"
///   }
/// }
/// ```
pub async fn summarize(
    State(state): State<AppState>,
    body: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let result = summary_service::summarise(
        state.store.as_ref(),
        state.relay.as_ref(),
        state.settings.limits,
        request,
    )
    .await?;

    Ok(Json(SummarizeResponse { result }))
}

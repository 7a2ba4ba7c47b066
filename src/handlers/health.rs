//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
///
/// Reports whether each collaborator is configured. Secret values are never
/// included.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: &'static str,

    /// Payment webhook secret present
    pub stripe: bool,

    /// AI relay credentials present
    pub openai: bool,

    /// Email delivery configured
    pub email: bool,

    /// Record store reachable
    pub database: bool,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "ok",
///   "stripe": true,
///   "openai": true,
///   "email": false,
///   "database": true,
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// `status` becomes `"degraded"` when the store cannot be reached.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "health check could not reach store");
            false
        }
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        stripe: state.settings.webhook_secret.is_some(),
        openai: state.relay.is_configured(),
        email: state.notifier.is_configured(),
        database,
        timestamp: Utc::now(),
    })
}

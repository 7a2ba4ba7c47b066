//! License Relay - license issuance and license-gated summarization.
//!
//! A small REST backend for a browser extension. Completed checkouts from the
//! payment provider become license keys; the extension presents a key with
//! page text and receives a structured summary from an AI completion relay.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Payments**: HMAC-SHA256 signed webhooks, idempotent per checkout
//! - **Relay**: OpenAI-compatible chat completions over reqwest
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod relay;
pub mod services;
pub mod signature;
pub mod state;
pub mod store;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let allow_origin = match state
        .settings
        .cors_allow_origin
        .as_deref()
        .and_then(|origin| HeaderValue::from_str(origin).ok())
    {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::any(),
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(handlers::health::health_check))
        .route("/api/verify", get(handlers::licenses::verify_license))
        .route("/api/summarize", post(handlers::summarize::summarize))
        .route(
            "/api/webhooks/stripe",
            post(handlers::webhooks::payment_webhook),
        )
        .layer(cors)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

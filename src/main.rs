//! License Relay - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build collaborator handles (store, relay, notifier)
//! 5. Build HTTP router and start server on configured port

use std::sync::Arc;

use license_relay::{
    config::Config,
    db, notifier,
    relay::OpenAiRelay,
    state::{AppState, Settings},
    store::PgLicenseStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let relay = OpenAiRelay::from_config(&config)?;
    let notifier = notifier::from_config(&config)?;
    let settings = Settings::from_config(&config);

    if settings.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, payment webhooks will be rejected");
    }
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, summaries will fail");
    }
    if !notifier.is_configured() {
        tracing::warn!("RESEND_API_KEY not set, issued keys will only be logged");
    }

    let state = AppState {
        store: Arc::new(PgLicenseStore::new(pool)),
        relay: Arc::new(relay),
        notifier,
        settings: Arc::new(settings),
    };

    let app = license_relay::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

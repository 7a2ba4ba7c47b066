//! Shared application state.
//!
//! Collaborator handles are built once in `main` and cloned into every
//! handler through axum's `State` extractor. Tests build the same state
//! around in-memory and fake collaborators.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::notifier::LicenseNotifier;
use crate::relay::CompletionRelay;
use crate::services::summary_service::SummarizeLimits;
use crate::store::LicenseStore;

/// Non-secret knobs and the webhook secret, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub webhook_secret: Option<String>,
    pub license_prefix: String,
    pub limits: SummarizeLimits,
    pub cors_allow_origin: Option<String>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            webhook_secret: config
                .stripe_webhook_secret
                .clone()
                .filter(|s| !s.is_empty()),
            license_prefix: config.license_prefix.clone(),
            limits: SummarizeLimits {
                max_input_chars: config.max_input_chars,
                relay_timeout: Duration::from_secs(config.relay_timeout_secs),
            },
            cors_allow_origin: config.cors_allow_origin.clone(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Licenses and usage log
    pub store: Arc<dyn LicenseStore>,

    /// AI completion relay
    pub relay: Arc<dyn CompletionRelay>,

    /// License key delivery
    pub notifier: Arc<dyn LicenseNotifier>,

    pub settings: Arc<Settings>,
}

//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `STRIPE_WEBHOOK_SECRET` (optional): signing secret for payment events
/// - `OPENAI_API_KEY` (optional): credentials for the completion relay
/// - `OPENAI_BASE_URL`, `OPENAI_MODEL` (optional): relay endpoint and model
/// - `RELAY_TIMEOUT_SECS` (optional): upper bound on a relay call, defaults to 30
/// - `RESEND_API_KEY`, `EMAIL_FROM` (optional): license delivery by email
/// - `LICENSE_PREFIX` (optional): first segment of every issued key, defaults to `SUMM`
/// - `MAX_INPUT_CHARS` (optional): page text is cut to this many characters, defaults to 6000
/// - `CORS_ALLOW_ORIGIN` (optional): single allowed origin; any origin when unset
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub stripe_webhook_secret: Option<String>,

    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_relay_timeout_secs")]
    pub relay_timeout_secs: u64,

    pub resend_api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default = "default_license_prefix")]
    pub license_prefix: String,

    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    pub cors_allow_origin: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_relay_timeout_secs() -> u64 {
    30
}

fn default_email_from() -> String {
    "licenses@example.com".to_string()
}

fn default_license_prefix() -> String {
    "SUMM".to_string()
}

fn default_max_input_chars() -> usize {
    6000
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - Values fail validation (see [`Config::validate`])
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;

        Ok(config)
    }

    /// Check values that deserialize fine but would break issuance or relaying.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.license_prefix.is_empty()
            || !self
                .license_prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ConfigError::Invalid(
                "LICENSE_PREFIX must be non-empty uppercase alphanumeric".to_string(),
            ));
        }

        if self.max_input_chars == 0 {
            return Err(ConfigError::Invalid(
                "MAX_INPUT_CHARS must be greater than zero".to_string(),
            ));
        }

        if let Some(origin) = &self.cors_allow_origin {
            axum::http::HeaderValue::from_str(origin).map_err(|_| {
                ConfigError::Invalid("CORS_ALLOW_ORIGIN is not a valid header value".to_string())
            })?;
        }

        url::Url::parse(&self.openai_base_url)
            .map_err(|_| ConfigError::Invalid("OPENAI_BASE_URL is not a valid URL".to_string()))?;

        Ok(())
    }
}

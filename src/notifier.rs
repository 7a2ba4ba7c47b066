//! License key delivery.
//!
//! Delivery is best-effort. The issuance service dispatches it on a detached
//! task and only logs the outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::models::license::License;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends an issued license key to its purchaser.
#[async_trait]
pub trait LicenseNotifier: Send + Sync {
    async fn deliver(&self, email: &str, license: &License) -> Result<(), NotifyError>;

    /// Whether a real delivery channel is configured.
    fn is_configured(&self) -> bool;
}

/// Build the notifier for this deployment: email when a Resend key is set,
/// otherwise log-only.
pub fn from_config(config: &Config) -> Result<Arc<dyn LicenseNotifier>, reqwest::Error> {
    match config.resend_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(api_key) => Ok(Arc::new(ResendNotifier::new(
            api_key.to_string(),
            config.email_from.clone(),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'static str,
    text: String,
}

/// Delivers keys through the Resend email API.
#[derive(Debug, Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(api_key: String, from: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl LicenseNotifier for ResendNotifier {
    async fn deliver(&self, email: &str, license: &License) -> Result<(), NotifyError> {
        let request = ResendEmailRequest {
            from: &self.from,
            to: [email],
            subject: "Your license key",
            text: license_email_body(&license.key),
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Writes the key to the log so an operator can deliver it by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl LicenseNotifier for LogNotifier {
    async fn deliver(&self, email: &str, license: &License) -> Result<(), NotifyError> {
        tracing::info!(
            email = %email,
            license_key = %license.key,
            "email delivery not configured, license key logged for manual delivery"
        );
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

fn license_email_body(key: &str) -> String {
    format!(
        "Thanks for your purchase!\n\n\
         Your license key is:\n\n    {key}\n\n\
         Open the extension settings and paste the key to unlock summaries.\n"
    )
}

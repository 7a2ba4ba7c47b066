//! AI completion relay.
//!
//! The relay is treated as opaque: a prompt goes in, free text comes out.
//! [`OpenAiRelay`] speaks the chat-completions protocol over `reqwest` with a
//! request timeout, so a hung upstream surfaces as [`RelayError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;

const SYSTEM_PROMPT: &str =
    "You summarize web pages. Reply with a single JSON object and nothing else.";

/// Errors from a relay call.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No credentials were configured for the relay.
    #[error("relay not configured")]
    NotConfigured,

    #[error("relay request timed out")]
    Timeout,

    /// Connection or transport failure before a response arrived.
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    /// The relay answered with a non-success status, or with no completion text.
    #[error("relay returned status {status}")]
    Upstream { status: u16, message: Option<String> },
}

impl RelayError {
    /// Message supplied by the upstream service, if any.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            RelayError::Upstream {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}

/// Text-in, text-out completion service.
#[async_trait]
pub trait CompletionRelay: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RelayError>;

    /// Whether credentials are present. Reported by the health endpoint.
    fn is_configured(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiRelay {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiRelay {
    /// Build the client once at start-up.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed (e.g. TLS backend error).
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.relay_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.openai_base_url.trim_end_matches('/')
            ),
            api_key: config.openai_api_key.clone().filter(|k| !k.is_empty()),
            model: config.openai_model.clone(),
        })
    }
}

#[async_trait]
impl CompletionRelay for OpenAiRelay {
    async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::NotConfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            // Best effort: pull `error.message` out of the body
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|e| e.error.message);

            tracing::warn!(status = status.as_u16(), message = ?message, "relay returned error status");

            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await.map_err(transport_error)?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(RelayError::Upstream {
                status: status.as_u16(),
                message: None,
            })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn transport_error(err: reqwest::Error) -> RelayError {
    if err.is_timeout() {
        RelayError::Timeout
    } else {
        RelayError::Unreachable(err.to_string())
    }
}

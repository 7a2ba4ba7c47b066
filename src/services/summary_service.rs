//! Summarization gateway.
//!
//! A request reaches the relay only after its license key verifies. Page
//! text is cut to a fixed number of characters, wrapped in a prompt that asks
//! for a fixed JSON shape, and the relay's answer is un-fenced and parsed.
//! A usage record is appended for every summary returned.

use std::time::Duration;

use crate::error::AppError;
use crate::models::summary::{Summary, SummarizeRequest};
use crate::relay::{CompletionRelay, RelayError};
use crate::services::license_service::{self, Verification};
use crate::store::LicenseStore;

/// Number of bullets a summary must carry.
pub const SUMMARY_BULLETS: usize = 3;

/// Limits applied to every summarization.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeLimits {
    /// Page text beyond this many characters is dropped
    pub max_input_chars: usize,

    /// Upper bound on the relay call
    pub relay_timeout: Duration,
}

/// Verify, relay, parse, record.
///
/// # Errors
///
/// - `MissingInput`: license key or text absent or blank
/// - `InvalidLicense`: key not found, inactive, or unreadable
/// - `Relay`: relay failed, errored, or exceeded `relay_timeout`
/// - `MalformedResponse`: relay output is not a valid summary
pub async fn summarise(
    store: &dyn LicenseStore,
    relay: &dyn CompletionRelay,
    limits: SummarizeLimits,
    request: SummarizeRequest,
) -> Result<Summary, AppError> {
    let license_key = request
        .license_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AppError::MissingInput("licenseKey"))?;

    let text = request
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::MissingInput("text"))?;

    let license = match license_service::verify(store, license_key).await {
        Verification::Valid(license) => license,
        Verification::NotFound => return Err(AppError::InvalidLicense),
    };

    let prompt = build_prompt(
        request.title.as_deref(),
        truncate_chars(text, limits.max_input_chars),
    );

    let raw = tokio::time::timeout(limits.relay_timeout, relay.complete(&prompt))
        .await
        .unwrap_or(Err(RelayError::Timeout))
        .inspect_err(|err| {
            tracing::warn!(license_key = %license.key, error = %err, "relay call failed");
        })?;

    let summary = parse_summary(&raw).inspect_err(|err| {
        tracing::warn!(license_key = %license.key, error = %err, "relay output rejected");
    })?;

    // Best effort: the summary is returned either way
    if let Err(err) = store.record_usage(&license.key).await {
        tracing::error!(license_key = %license.key, error = %err, "failed to record usage");
    }

    Ok(summary)
}

/// Longest prefix of `text` holding at most `max_chars` characters.
///
/// Cuts on a character boundary, never inside a multi-byte sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Prompt asking the relay for the summary JSON shape.
pub fn build_prompt(title: Option<&str>, text: &str) -> String {
    let title = title.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("Untitled");

    format!(
        "Summarize the web page below.\n\
         Respond with ONLY a JSON object of this form, no prose and no markdown:\n\
         {{\"headline\": \"<what the page is about, at most 15 words>\", \
         \"bullets\": [\"<point>\", \"<point>\", \"<point>\"], \
         \"readTime\": \"<time to read the full page, e.g. 4 min>\"}}\n\
         The bullets array must hold exactly {SUMMARY_BULLETS} strings.\n\n\
         Title: {title}\n\n\
         Page:\n{text}"
    )
}

/// Remove a surrounding markdown code fence, if any.
///
/// Accepts unfenced text, a fence with or without a language tag (```` ```json ````),
/// a single-line fence, and a missing closing fence. Surrounding whitespace is
/// trimmed in every case.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse relay output into a [`Summary`].
pub fn parse_summary(raw: &str) -> Result<Summary, AppError> {
    let summary: Summary = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| AppError::MalformedResponse(e.to_string()))?;

    if summary.bullets.len() != SUMMARY_BULLETS {
        return Err(AppError::MalformedResponse(format!(
            "expected {SUMMARY_BULLETS} bullets, got {}",
            summary.bullets.len()
        )));
    }

    Ok(summary)
}

//! Summarize and verify request/response types.
//!
//! Field names are camelCase on the wire to match the browser extension.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/summarize`.
///
/// # JSON Example
///
/// ```json
/// {
///   "licenseKey": "SUMM-1A2B3C-4D5E6F-A1B2C3",
///   "title": "Page title",
///   "text": "Visible page text..."
/// }
/// ```
///
/// Every field is optional at the parsing stage so that a missing key or
/// text is reported as `missing_input` rather than a generic decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub license_key: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
}

/// Structured summary returned by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// One-line intent of the page, about 15 words
    pub headline: String,

    /// Exactly three key points
    pub bullets: Vec<String>,

    /// Estimated reading time of the original, e.g. "4 min"
    pub read_time: String,
}

/// Response body for a successful summarization.
#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub result: Summary,
}

/// Query string for `GET /api/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub key: Option<String>,
}

/// Response for `GET /api/verify`. Never says why a key is invalid.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

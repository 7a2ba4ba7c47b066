//! HTTP request handlers (route handlers).
//!
//! Handlers extract request data, call into [`crate::services`], and map the
//! result to JSON. Errors become responses through [`crate::error::AppError`].

/// Health and configuration status
pub mod health;
/// Standalone license verification
pub mod licenses;
/// License-gated summarization
pub mod summarize;
/// Payment provider events
pub mod webhooks;

//! Data models representing database entities and API payloads.

/// License record and key generation
pub mod license;
/// Verified payment events
pub mod payment;
/// Summarize and verify request/response types
pub mod summary;
/// Usage log record
pub mod usage;

//! Usage log model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One successful summarization charged against a license key.
///
/// # Database Table
///
/// Maps to the `usage` table. `license_key` is the key's value, not a foreign
/// key, so records survive a license being deactivated. Rows are only ever
/// appended.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UsageRecord {
    pub id: i64,
    pub license_key: String,
    pub created_at: DateTime<Utc>,
}

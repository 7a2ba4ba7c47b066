//! License data model and key generation.
//!
//! A license key looks like `SUMM-1A2B3C-4D5E6F-A1B2C3`: a configurable prefix
//! followed by three segments of six uppercase hex characters, each segment
//! carrying 24 bits of randomness.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of random segments following the prefix.
const SEGMENTS: usize = 3;

/// Random bytes per segment (3 bytes = 6 hex characters).
const SEGMENT_BYTES: usize = 3;

/// A license key as handed to the purchaser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Generate a fresh key with the given prefix.
    ///
    /// Randomness comes from the thread-local CSPRNG. No collision check is
    /// made here; the store's unique constraint on `licenses.key` catches
    /// the (negligible) case of a repeat.
    pub fn generate(prefix: &str) -> Self {
        let mut key = String::with_capacity(prefix.len() + SEGMENTS * (SEGMENT_BYTES * 2 + 1));
        key.push_str(prefix);

        for _ in 0..SEGMENTS {
            let bytes: [u8; SEGMENT_BYTES] = rand::random();
            key.push('-');
            key.push_str(&hex::encode_upper(bytes));
        }

        Self(key)
    }

    /// Wrap a key received from a client. No normalisation is applied: keys
    /// are matched exactly as issued.
    pub fn from_client(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key has the issued shape: a non-empty uppercase
    /// alphanumeric prefix followed by three six-character hex segments.
    ///
    /// The prefix itself is not compared against configuration, so keys
    /// issued under an earlier prefix still pass.
    pub fn is_well_formed(&self) -> bool {
        let mut parts = self.0.split('-');

        let prefix_ok = parts.next().is_some_and(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        });

        let segments: Vec<&str> = parts.collect();

        prefix_ok
            && segments.len() == SEGMENTS
            && segments.iter().all(|s| {
                s.len() == SEGMENT_BYTES * 2
                    && s.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a license record from the database.
///
/// # Database Table
///
/// Maps to the `licenses` table. Both `key` and `external_payment_reference`
/// carry unique constraints: the first keeps keys distinct, the second makes
/// issuance idempotent per checkout.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct License {
    pub id: Uuid,

    /// The key handed to the purchaser
    pub key: String,

    /// Purchaser email, absent when the checkout did not collect one
    pub email: Option<String>,

    /// Checkout session id from the payment provider
    pub external_payment_reference: String,

    /// Flipped to false by an operator to revoke the license
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

/// Values for a license about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub key: LicenseKey,
    pub email: Option<String>,
    pub external_payment_reference: String,
}

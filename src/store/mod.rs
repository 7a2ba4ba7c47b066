//! Record store seam.
//!
//! Services talk to persistence through [`LicenseStore`] so the handlers can
//! run against Postgres in production and an in-memory store in tests.
//! Uniqueness of `licenses.key` and `licenses.external_payment_reference` is
//! enforced by every implementation; it is the authoritative guard against
//! duplicate issuance when two deliveries of one event race.

use async_trait::async_trait;

use crate::models::license::{License, NewLicense};
use crate::models::usage::UsageRecord;

mod memory;
mod postgres;

pub use memory::MemoryLicenseStore;
pub use postgres::PgLicenseStore;

/// Unique constraint on `licenses.key`.
pub const KEY_CONSTRAINT: &str = "licenses_key_key";

/// Unique constraint on `licenses.external_payment_reference`.
pub const PAYMENT_REFERENCE_CONSTRAINT: &str = "licenses_external_payment_reference_key";

/// Errors raised by a [`LicenseStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert collided with an existing row.
    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The store could not be reached or is in a bad state.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this is a unique violation of `constraint`.
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }

        StoreError::Database(err)
    }
}

/// Keyed record store holding licenses and the usage log.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Exactly one license whose key equals `key` and which is active.
    async fn find_active_by_key(&self, key: &str) -> Result<Option<License>, StoreError>;

    /// The license issued for a checkout, active or not.
    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<License>, StoreError>;

    /// Insert a new active license. Fails with [`StoreError::UniqueViolation`]
    /// rather than overwriting when the key or payment reference exists.
    async fn insert_license(&self, license: &NewLicense) -> Result<License, StoreError>;

    /// Append a usage record for `license_key`.
    async fn record_usage(&self, license_key: &str) -> Result<UsageRecord, StoreError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

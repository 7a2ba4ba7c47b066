//! License verification.
//!
//! Every gated request goes through [`verify`]. It answers only
//! valid / not found: a never-issued key, a revoked key, and a key that could
//! not be looked up because the store failed all look the same to the caller.
//! Store failures are still logged so operators can tell them apart.

use crate::models::license::{License, LicenseKey};
use crate::store::{LicenseStore, StoreError};

/// Caller-facing verification result.
#[derive(Debug, Clone)]
pub enum Verification {
    Valid(License),
    NotFound,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }
}

/// Look up an active license by key, keeping store errors visible.
///
/// Keys that cannot have been issued are answered without touching the store.
pub async fn lookup(store: &dyn LicenseStore, key: &str) -> Result<Option<License>, StoreError> {
    if !LicenseKey::from_client(key).is_well_formed() {
        return Ok(None);
    }

    store.find_active_by_key(key).await
}

/// Verify a presented key. Fails closed on store errors.
pub async fn verify(store: &dyn LicenseStore, key: &str) -> Verification {
    match lookup(store, key).await {
        Ok(Some(license)) => Verification::Valid(license),
        Ok(None) => Verification::NotFound,
        Err(err) => {
            tracing::error!(error = %err, "license lookup failed, treating key as invalid");
            Verification::NotFound
        }
    }
}

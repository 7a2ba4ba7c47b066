//! Postgres-backed [`LicenseStore`].

use async_trait::async_trait;

use super::{LicenseStore, StoreError};
use crate::db::DbPool;
use crate::models::license::{License, NewLicense};
use crate::models::usage::UsageRecord;

/// Store backed by the `licenses` and `usage` tables.
#[derive(Debug, Clone)]
pub struct PgLicenseStore {
    pool: DbPool,
}

impl PgLicenseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LicenseStore for PgLicenseStore {
    async fn find_active_by_key(&self, key: &str) -> Result<Option<License>, StoreError> {
        // Served by the unique index on key
        let license = sqlx::query_as::<_, License>(
            "SELECT id, key, email, external_payment_reference, active, created_at
             FROM licenses
             WHERE key = $1 AND active = true",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(license)
    }

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<License>, StoreError> {
        let license = sqlx::query_as::<_, License>(
            "SELECT id, key, email, external_payment_reference, active, created_at
             FROM licenses
             WHERE external_payment_reference = $1",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(license)
    }

    async fn insert_license(&self, license: &NewLicense) -> Result<License, StoreError> {
        // Plain INSERT: a duplicate key or reference must surface as an error
        let license = sqlx::query_as::<_, License>(
            r#"
            INSERT INTO licenses (id, key, email, external_payment_reference, active)
            VALUES ($1, $2, $3, $4, true)
            RETURNING id, key, email, external_payment_reference, active, created_at
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(license.key.as_str())
        .bind(license.email.as_deref())
        .bind(&license.external_payment_reference)
        .fetch_one(&self.pool)
        .await?;

        Ok(license)
    }

    async fn record_usage(&self, license_key: &str) -> Result<UsageRecord, StoreError> {
        let record = sqlx::query_as::<_, UsageRecord>(
            "INSERT INTO usage (license_key) VALUES ($1) RETURNING id, license_key, created_at",
        )
        .bind(license_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

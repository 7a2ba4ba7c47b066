//! In-memory [`LicenseStore`] for tests and local development.
//!
//! Enforces the same uniqueness rules as the Postgres schema. Failures can be
//! injected per operation class to exercise error paths.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{KEY_CONSTRAINT, LicenseStore, PAYMENT_REFERENCE_CONSTRAINT, StoreError};
use crate::models::license::{License, NewLicense};
use crate::models::usage::UsageRecord;

#[derive(Debug, Default)]
struct Tables {
    licenses: Vec<License>,
    usage: Vec<UsageRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryLicenseStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_license_writes: AtomicBool,
    fail_usage_writes: AtomicBool,
}

impl MemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every lookup fail with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make license inserts fail with [`StoreError::Unavailable`].
    pub fn fail_license_writes(&self, fail: bool) {
        self.fail_license_writes.store(fail, Ordering::SeqCst);
    }

    /// Make usage inserts fail with [`StoreError::Unavailable`].
    pub fn fail_usage_writes(&self, fail: bool) {
        self.fail_usage_writes.store(fail, Ordering::SeqCst);
    }

    /// Revoke a license, as an operator would. Returns whether it existed.
    pub fn deactivate(&self, key: &str) -> bool {
        let Ok(mut tables) = self.tables.lock() else {
            return false;
        };

        match tables.licenses.iter_mut().find(|l| l.key == key) {
            Some(license) => {
                license.active = false;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all stored licenses.
    pub fn licenses(&self) -> Vec<License> {
        self.tables
            .lock()
            .map(|t| t.licenses.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the usage log.
    pub fn usage_records(&self) -> Vec<UsageRecord> {
        self.tables
            .lock()
            .map(|t| t.usage.clone())
            .unwrap_or_default()
    }

    fn check(&self, flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{operation} failed (injected)")));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn find_active_by_key(&self, key: &str) -> Result<Option<License>, StoreError> {
        self.check(&self.fail_reads, "read")?;

        Ok(self
            .lock()?
            .licenses
            .iter()
            .find(|l| l.key == key && l.active)
            .cloned())
    }

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<License>, StoreError> {
        self.check(&self.fail_reads, "read")?;

        Ok(self
            .lock()?
            .licenses
            .iter()
            .find(|l| l.external_payment_reference == reference)
            .cloned())
    }

    async fn insert_license(&self, license: &NewLicense) -> Result<License, StoreError> {
        self.check(&self.fail_license_writes, "license insert")?;

        // Check and insert under one lock, mirroring the table constraints
        let mut tables = self.lock()?;

        if tables.licenses.iter().any(|l| l.key == license.key.as_str()) {
            return Err(StoreError::UniqueViolation {
                constraint: KEY_CONSTRAINT.to_string(),
            });
        }

        if tables
            .licenses
            .iter()
            .any(|l| l.external_payment_reference == license.external_payment_reference)
        {
            return Err(StoreError::UniqueViolation {
                constraint: PAYMENT_REFERENCE_CONSTRAINT.to_string(),
            });
        }

        let stored = License {
            id: Uuid::new_v4(),
            key: license.key.as_str().to_string(),
            email: license.email.clone(),
            external_payment_reference: license.external_payment_reference.clone(),
            active: true,
            created_at: Utc::now(),
        };
        tables.licenses.push(stored.clone());

        Ok(stored)
    }

    async fn record_usage(&self, license_key: &str) -> Result<UsageRecord, StoreError> {
        self.check(&self.fail_usage_writes, "usage insert")?;

        let mut tables = self.lock()?;
        let record = UsageRecord {
            id: tables.usage.len() as i64 + 1,
            license_key: license_key.to_string(),
            created_at: Utc::now(),
        };
        tables.usage.push(record.clone());

        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check(&self.fail_reads, "ping")
    }
}

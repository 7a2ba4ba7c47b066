//! Issuance service - turns a completed checkout into exactly one license.
//!
//! This service handles:
//! - Idempotency per payment reference
//! - Key collision retries
//! - Detached, best-effort delivery of the key
//!
//! # Idempotency Guarantees
//!
//! Payment providers redeliver events. A pre-check by payment reference
//! catches ordinary redelivery; the unique constraint on
//! `external_payment_reference` catches two deliveries racing past the
//! pre-check. The loser re-reads the winner's row and reports it as
//! already issued.

use std::sync::Arc;

use crate::models::license::{License, LicenseKey, NewLicense};
use crate::models::payment::VerifiedPaymentEvent;
use crate::notifier::LicenseNotifier;
use crate::store::{KEY_CONSTRAINT, LicenseStore, PAYMENT_REFERENCE_CONSTRAINT, StoreError};

/// Attempts at inserting with a fresh key before giving up.
const MAX_KEY_ATTEMPTS: usize = 3;

/// What happened to a verified payment event.
#[derive(Debug, Clone)]
pub enum IssuanceOutcome {
    /// A new license was stored; delivery has been dispatched.
    Issued(License),

    /// This checkout already has a license; nothing was written or sent.
    AlreadyIssued(License),

    /// Event type or payment status does not call for a license.
    Ignored,
}

impl IssuanceOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            IssuanceOutcome::Issued(_) => "issued",
            IssuanceOutcome::AlreadyIssued(_) => "already_issued",
            IssuanceOutcome::Ignored => "ignored",
        }
    }
}

/// React to a verified payment event.
///
/// # Process
///
/// 1. Ignore anything but a paid `checkout.session.completed`
/// 2. Return the existing license if this checkout was already handled
/// 3. Insert a license under a freshly generated key
/// 4. Dispatch delivery on a detached task
///
/// # Errors
///
/// Only store failures are returned, so the event source retries. Delivery
/// failures never reach the caller.
pub async fn on_payment_completed(
    store: &Arc<dyn LicenseStore>,
    notifier: &Arc<dyn LicenseNotifier>,
    prefix: &str,
    event: &VerifiedPaymentEvent,
) -> Result<IssuanceOutcome, StoreError> {
    if !event.is_completed_payment() {
        tracing::debug!(
            event_type = %event.event_type,
            payment_status = ?event.payment_status,
            "payment event does not trigger issuance"
        );
        return Ok(IssuanceOutcome::Ignored);
    }

    let reference = event.transaction_reference.as_str();

    if let Some(existing) = store.find_by_payment_reference(reference).await? {
        tracing::info!(payment_reference = %reference, "payment already handled, skipping issuance");
        return Ok(IssuanceOutcome::AlreadyIssued(existing));
    }

    let license = match insert_with_fresh_key(store.as_ref(), prefix, event).await {
        Ok(license) => license,
        Err(err) if err.violates(PAYMENT_REFERENCE_CONSTRAINT) => {
            // Lost a race with a concurrent delivery of the same event
            let existing = store
                .find_by_payment_reference(reference)
                .await?
                .ok_or(err)?;

            tracing::info!(payment_reference = %reference, "concurrent delivery already issued license");
            return Ok(IssuanceOutcome::AlreadyIssued(existing));
        }
        Err(err) => return Err(err),
    };

    tracing::info!(
        license_key = %license.key,
        payment_reference = %reference,
        email = ?license.email,
        "issued license"
    );

    dispatch_delivery(Arc::clone(notifier), &license);

    Ok(IssuanceOutcome::Issued(license))
}

async fn insert_with_fresh_key(
    store: &dyn LicenseStore,
    prefix: &str,
    event: &VerifiedPaymentEvent,
) -> Result<License, StoreError> {
    let mut attempt = 1;

    loop {
        let new_license = NewLicense {
            key: LicenseKey::generate(prefix),
            email: event.customer_email.clone(),
            external_payment_reference: event.transaction_reference.clone(),
        };

        match store.insert_license(&new_license).await {
            Err(err) if err.violates(KEY_CONSTRAINT) && attempt < MAX_KEY_ATTEMPTS => {
                tracing::warn!(attempt, "license key collision, regenerating");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Send the key on a detached task. Failures are logged only.
fn dispatch_delivery(notifier: Arc<dyn LicenseNotifier>, license: &License) {
    let Some(email) = license.email.clone() else {
        tracing::warn!(license_key = %license.key, "no purchaser email, license not delivered");
        return;
    };

    let license = license.clone();
    tokio::spawn(async move {
        match notifier.deliver(&email, &license).await {
            Ok(()) => tracing::info!(license_key = %license.key, "license delivered"),
            Err(err) => tracing::error!(
                license_key = %license.key,
                error = %err,
                "license delivery failed"
            ),
        }
    });
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::usage::UsageRecord;
    use crate::notifier::LogNotifier;
    use crate::store::MemoryLicenseStore;

    fn paid_event(reference: &str) -> VerifiedPaymentEvent {
        VerifiedPaymentEvent {
            event_type: "checkout.session.completed".into(),
            customer_email: Some("buyer@example.com".into()),
            transaction_reference: reference.into(),
            payment_status: Some("paid".into()),
        }
    }

    fn log_notifier() -> Arc<dyn LicenseNotifier> {
        Arc::new(LogNotifier)
    }

    /// Rejects the first `collisions` inserts as key collisions.
    struct CollidingStore {
        inner: MemoryLicenseStore,
        collisions: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LicenseStore for CollidingStore {
        async fn find_active_by_key(&self, key: &str) -> Result<Option<License>, StoreError> {
            self.inner.find_active_by_key(key).await
        }

        async fn find_by_payment_reference(
            &self,
            reference: &str,
        ) -> Result<Option<License>, StoreError> {
            self.inner.find_by_payment_reference(reference).await
        }

        async fn insert_license(&self, license: &NewLicense) -> Result<License, StoreError> {
            use std::sync::atomic::Ordering;

            let remaining = self.collisions.load(Ordering::SeqCst);
            if remaining > 0 {
                self.collisions.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::UniqueViolation {
                    constraint: KEY_CONSTRAINT.to_string(),
                });
            }
            self.inner.insert_license(license).await
        }

        async fn record_usage(&self, license_key: &str) -> Result<UsageRecord, StoreError> {
            self.inner.record_usage(license_key).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Hides existing rows from the first reference lookup, as if a
    /// concurrent delivery inserted between the pre-check and the insert.
    struct RacingStore {
        inner: MemoryLicenseStore,
        stale_reads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LicenseStore for RacingStore {
        async fn find_active_by_key(&self, key: &str) -> Result<Option<License>, StoreError> {
            self.inner.find_active_by_key(key).await
        }

        async fn find_by_payment_reference(
            &self,
            reference: &str,
        ) -> Result<Option<License>, StoreError> {
            use std::sync::atomic::Ordering;

            if self.stale_reads.load(Ordering::SeqCst) > 0 {
                self.stale_reads.fetch_sub(1, Ordering::SeqCst);
                return Ok(None);
            }
            self.inner.find_by_payment_reference(reference).await
        }

        async fn insert_license(&self, license: &NewLicense) -> Result<License, StoreError> {
            self.inner.insert_license(license).await
        }

        async fn record_usage(&self, license_key: &str) -> Result<UsageRecord, StoreError> {
            self.inner.record_usage(license_key).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn losing_a_race_reports_already_issued() {
        let racing = Arc::new(RacingStore {
            inner: MemoryLicenseStore::new(),
            stale_reads: 0.into(),
        });
        let store: Arc<dyn LicenseStore> = racing.clone();
        let notifier = log_notifier();

        let first = on_payment_completed(&store, &notifier, "SUMM", &paid_event("cs_1"))
            .await
            .unwrap();

        racing
            .stale_reads
            .store(1, std::sync::atomic::Ordering::SeqCst);
        let second = on_payment_completed(&store, &notifier, "SUMM", &paid_event("cs_1"))
            .await
            .unwrap();

        let (IssuanceOutcome::Issued(a), IssuanceOutcome::AlreadyIssued(b)) = (first, second)
        else {
            panic!("expected issued then already issued");
        };
        assert_eq!(a.id, b.id);
        assert_eq!(racing.inner.licenses().len(), 1);
    }

    #[tokio::test]
    async fn redelivery_issues_once() {
        let memory = Arc::new(MemoryLicenseStore::new());
        let store: Arc<dyn LicenseStore> = memory.clone();
        let notifier = log_notifier();

        let first = on_payment_completed(&store, &notifier, "SUMM", &paid_event("cs_1"))
            .await
            .unwrap();
        let second = on_payment_completed(&store, &notifier, "SUMM", &paid_event("cs_1"))
            .await
            .unwrap();

        let (IssuanceOutcome::Issued(a), IssuanceOutcome::AlreadyIssued(b)) = (first, second)
        else {
            panic!("expected issued then already issued");
        };
        assert_eq!(a.key, b.key);
        assert_eq!(memory.licenses().len(), 1);
    }

    #[tokio::test]
    async fn unpaid_and_other_events_are_ignored() {
        let memory = Arc::new(MemoryLicenseStore::new());
        let store: Arc<dyn LicenseStore> = memory.clone();
        let notifier = log_notifier();

        let mut unpaid = paid_event("cs_1");
        unpaid.payment_status = Some("unpaid".into());
        let mut expired = paid_event("cs_2");
        expired.event_type = "checkout.session.expired".into();

        for event in [unpaid, expired] {
            let outcome = on_payment_completed(&store, &notifier, "SUMM", &event)
                .await
                .unwrap();
            assert!(matches!(outcome, IssuanceOutcome::Ignored));
        }
        assert!(memory.licenses().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_is_reported() {
        let memory = Arc::new(MemoryLicenseStore::new());
        memory.fail_license_writes(true);
        let store: Arc<dyn LicenseStore> = memory.clone();

        let result =
            on_payment_completed(&store, &log_notifier(), "SUMM", &paid_event("cs_1")).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(memory.licenses().is_empty());
    }

    #[tokio::test]
    async fn key_collision_is_retried() {
        let store: Arc<dyn LicenseStore> = Arc::new(CollidingStore {
            inner: MemoryLicenseStore::new(),
            collisions: 2.into(),
        });

        let outcome = on_payment_completed(&store, &log_notifier(), "SUMM", &paid_event("cs_1"))
            .await
            .unwrap();
        assert!(matches!(outcome, IssuanceOutcome::Issued(_)));
    }

    #[tokio::test]
    async fn repeated_key_collisions_give_up() {
        let store: Arc<dyn LicenseStore> = Arc::new(CollidingStore {
            inner: MemoryLicenseStore::new(),
            collisions: MAX_KEY_ATTEMPTS.into(),
        });

        let result =
            on_payment_completed(&store, &log_notifier(), "SUMM", &paid_event("cs_1")).await;
        assert!(matches!(result, Err(err) if err.violates(KEY_CONSTRAINT)));
    }

    #[tokio::test]
    async fn missing_email_still_issues() {
        let memory = Arc::new(MemoryLicenseStore::new());
        let store: Arc<dyn LicenseStore> = memory.clone();
        let mut event = paid_event("cs_1");
        event.customer_email = None;

        let outcome = on_payment_completed(&store, &log_notifier(), "SUMM", &event)
            .await
            .unwrap();

        let IssuanceOutcome::Issued(license) = outcome else {
            panic!("expected a license");
        };
        assert!(license.email.is_none());
        assert!(license.active);
    }
}

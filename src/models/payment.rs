//! Payment event models.
//!
//! Raw webhook payloads are deserialized into the Stripe-shaped structs below
//! and then narrowed to a [`VerifiedPaymentEvent`]. Only
//! [`crate::signature::verify_signature`] constructs a verified event from
//! untrusted input, so the issuance service never sees an unauthenticated one.

use serde::Deserialize;

/// Event type that triggers license issuance.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Top-level webhook envelope.
#[derive(Debug, Deserialize)]
pub struct RawPaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: RawEventData,
}

#[derive(Debug, Deserialize)]
pub struct RawEventData {
    pub object: RawCheckoutSession,
}

/// The subset of a checkout session this service reads.
#[derive(Debug, Deserialize)]
pub struct RawCheckoutSession {
    pub id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<RawCustomerDetails>,
    pub payment_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCustomerDetails {
    pub email: Option<String>,
}

/// A payment event whose signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPaymentEvent {
    /// Event type discriminator, e.g. `checkout.session.completed`
    pub event_type: String,

    /// Purchaser email if the checkout collected one
    pub customer_email: Option<String>,

    /// Checkout session id; the idempotency key for issuance
    pub transaction_reference: String,

    /// `paid`, `unpaid` or `no_payment_required` when present
    pub payment_status: Option<String>,
}

impl VerifiedPaymentEvent {
    /// Whether this event should result in a license.
    ///
    /// A missing `payment_status` counts as paid: older payloads omit it.
    pub fn is_completed_payment(&self) -> bool {
        self.event_type == CHECKOUT_COMPLETED
            && self
                .payment_status
                .as_deref()
                .is_none_or(|s| s == "paid" || s == "no_payment_required")
    }
}

impl RawPaymentEvent {
    /// Narrow to the fields issuance needs. Returns `None` when the object has
    /// no id to use as a transaction reference.
    pub fn into_verified(self) -> Option<VerifiedPaymentEvent> {
        let session = self.data.object;
        let transaction_reference = session.id.filter(|id| !id.is_empty())?;

        let customer_email = session
            .customer_email
            .or_else(|| session.customer_details.and_then(|d| d.email))
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Some(VerifiedPaymentEvent {
            event_type: self.event_type,
            customer_email,
            transaction_reference,
            payment_status: session.payment_status,
        })
    }
}

//! Test utilities and fixtures for integration tests.
//!
//! Builds the real router around the in-memory store and fake relay and
//! notifier implementations that record how they were called.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub use license_relay::models::license::{LicenseKey, NewLicense};
pub use license_relay::notifier::{LicenseNotifier, NotifyError};
pub use license_relay::relay::{CompletionRelay, RelayError};
pub use license_relay::services::summary_service::SummarizeLimits;
pub use license_relay::state::{AppState, Settings};
pub use license_relay::store::{LicenseStore, MemoryLicenseStore};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const PREFIX: &str = "SUMM";

pub const SUMMARY_JSON: &str = r#"{"headline":"Rust makes systems programming safer","bullets":["Ownership","Borrowing","Lifetimes"],"readTime":"5 min"}"#;

/// What the fake relay answers with.
#[derive(Debug, Clone)]
pub enum RelayReply {
    Text(String),
    Upstream { status: u16, message: Option<String> },
    Unreachable,
    Hang,
}

/// Relay double that counts calls and keeps the last prompt.
pub struct FakeRelay {
    reply: Mutex<RelayReply>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeRelay {
    pub fn new(reply: RelayReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn set_reply(&self, reply: RelayReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionRelay for FakeRelay {
    async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        let reply = self.reply.lock().unwrap().clone();
        match reply {
            RelayReply::Text(text) => Ok(text),
            RelayReply::Upstream { status, message } => Err(RelayError::Upstream { status, message }),
            RelayReply::Unreachable => Err(RelayError::Unreachable("connection refused".into())),
            RelayReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Notifier double reporting each delivery attempt on a channel.
pub struct FakeNotifier {
    fail: bool,
    attempts: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl LicenseNotifier for FakeNotifier {
    async fn deliver(
        &self,
        email: &str,
        license: &license_relay::models::license::License,
    ) -> Result<(), NotifyError> {
        let _ = self.attempts.send((email.to_string(), license.key.clone()));

        if self.fail {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "mail server down".into(),
            });
        }
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryLicenseStore>,
    pub relay: Arc<FakeRelay>,
    /// (email, license key) for every delivery attempt
    pub deliveries: mpsc::UnboundedReceiver<(String, String)>,
}

pub struct TestOptions {
    pub webhook_secret: Option<String>,
    pub notifier_fails: bool,
    pub relay_timeout: Duration,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            notifier_fails: false,
            relay_timeout: Duration::from_secs(5),
        }
    }
}

pub fn test_app() -> TestApp {
    test_app_with(TestOptions::default())
}

pub fn test_app_with(options: TestOptions) -> TestApp {
    let store = Arc::new(MemoryLicenseStore::new());
    let relay = Arc::new(FakeRelay::new(RelayReply::Text(SUMMARY_JSON.to_string())));
    let (tx, rx) = mpsc::unbounded_channel();
    let notifier = Arc::new(FakeNotifier {
        fail: options.notifier_fails,
        attempts: tx,
    });

    let state = AppState {
        store: store.clone(),
        relay: relay.clone(),
        notifier,
        settings: Arc::new(Settings {
            webhook_secret: options.webhook_secret,
            license_prefix: PREFIX.to_string(),
            limits: SummarizeLimits {
                max_input_chars: 6000,
                relay_timeout: options.relay_timeout,
            },
            cors_allow_origin: None,
        }),
    };

    TestApp {
        router: license_relay::build_router(state),
        store,
        relay,
        deliveries: rx,
    }
}

/// Insert an active license directly and return its key.
pub async fn issue_license(store: &MemoryLicenseStore, reference: &str) -> String {
    let key = LicenseKey::generate(PREFIX);
    store
        .insert_license(&NewLicense {
            key: key.clone(),
            email: Some("buyer@example.com".into()),
            external_payment_reference: reference.into(),
        })
        .await
        .expect("Failed to insert test license");
    key.as_str().to_string()
}

/// Compute a `Stripe-Signature` header for `payload`.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn checkout_completed(session_id: &str, email: Option<&str>) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "object": "checkout.session",
            "customer_email": email,
            "payment_status": "paid"
        }}
    }))
    .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("Response should be valid JSON")
    };
    (status, json)
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// POST a signed payment event.
pub async fn post_webhook(router: &Router, payload: Vec<u8>, signature: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("Content-Type", "application/json")
            .header("Stripe-Signature", signature)
            .body(Body::from(payload))
            .unwrap(),
    )
    .await
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

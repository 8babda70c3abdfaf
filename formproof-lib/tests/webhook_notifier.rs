//! Integration tests for the webhook notification backend.
//!
//! ```bash
//! cargo test -p formproof-lib --features http-executor --test webhook_notifier
//! ```

#![cfg(feature = "http-executor")]

use std::sync::Arc;
use std::time::Duration;

use formproof_lib::credits::{CreditPolicy, InMemoryCreditStore};
use formproof_lib::notify::{Notification, Notifier, WebhookNotifier};
use formproof_lib::{Amount, CreditLedger, DependencyError, ErrorClass, NotaryError};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn notifier_for(server: &MockServer) -> WebhookNotifier {
    WebhookNotifier::new(format!("{}/hooks/notary", server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_webhook_posts_recipient_event_and_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/notary"))
        .and(body_partial_json(serde_json::json!({
            "recipient": "owner@example.com",
            "event": "ping",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = notifier_for(&server);
    assert_eq!(notifier.name(), "webhook");

    let payload = Notification {
        event: "ping".into(),
        data: serde_json::json!({"totalCredits": 3}),
    };
    notifier.send("owner@example.com", &payload).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["recipient"], "owner@example.com");
    assert_eq!(body["event"], "ping");
    assert_eq!(body["data"]["totalCredits"], 3);
    assert!(body.get("notification").is_none());
}

#[tokio::test]
async fn test_webhook_server_error_is_dependency_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/notary"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let payload = Notification {
        event: "ping".into(),
        data: serde_json::Value::Null,
    };
    let err = notifier_for(&server)
        .send("owner@example.com", &payload)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NotaryError::Dependency(DependencyError::Unavailable { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Dependency);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_issuance_survives_failing_webhook() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/notary"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let ledger = CreditLedger::new(Arc::new(InMemoryCreditStore::new()), CreditPolicy::default())
        .with_notifier(Arc::new(notifier_for(&server)));

    let token = ledger
        .issue_with_notice("tx-webhook", Amount::from_units(2), Some("owner@example.com"))
        .await
        .unwrap();
    assert_eq!(token.total_credits, 2);

    let status = ledger.status(token.id.as_str()).await.unwrap();
    assert_eq!(status.remaining_credits, 2);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["event"], "credential_issued");
    assert_eq!(body["data"]["accessToken"], token.id.as_str());
}

//! Integration tests for the Esplora ledger backend.
//!
//! Every test runs against a wiremock server; no network access is needed.
//!
//! ```bash
//! cargo test -p formproof-lib --features http-executor --test esplora_integration
//! ```

#![cfg(feature = "http-executor")]

use std::sync::Arc;
use std::time::Duration;

use formproof_lib::payment::{
    EsploraConfig, EsploraLedger, LedgerQuery, PaymentConfig, PaymentError, PaymentVerifier,
};
use formproof_lib::test_utils::{payment_txid, PLATFORM_ADDRESS};
use formproof_lib::{Amount, NotaryError};
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

fn tx_body(tx_id: &str, outputs: serde_json::Value, height: Option<u64>) -> serde_json::Value {
    serde_json::json!({
        "txid": tx_id,
        "version": 2,
        "status": match height {
            Some(h) => serde_json::json!({"confirmed": true, "block_height": h}),
            None => serde_json::json!({"confirmed": false}),
        },
        "vin": [],
        "vout": outputs
    })
}

fn ledger_for(server: &MockServer) -> EsploraLedger {
    let config = EsploraConfig::new(server.uri()).with_timeout(5);
    EsploraLedger::new(config).unwrap()
}

fn verifier_for(server: &MockServer, minimum: Amount) -> PaymentVerifier {
    PaymentVerifier::new(
        Arc::new(ledger_for(server)),
        PaymentConfig::new(PLATFORM_ADDRESS),
        minimum,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_esplora_get_transaction_mock() {
    let server = MockServer::start().await;
    let tx_id = payment_txid(1);

    Mock::given(method("GET"))
        .and(path(format!("/tx/{}", tx_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(tx_body(
            &tx_id,
            serde_json::json!([
                {"value": 150_000_000u64, "scriptpubkey_address": PLATFORM_ADDRESS},
                {"value": 4_000u64, "scriptpubkey_address": "tb1qchange"}
            ]),
            Some(800_000),
        )))
        .mount(&server)
        .await;

    let tx = ledger_for(&server).get_transaction(&tx_id).await.unwrap();
    assert_eq!(tx.tx_id, tx_id);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.block_height, Some(800_000));
}

#[tokio::test]
async fn test_esplora_tip_height_mock() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blocks/tip/height"))
        .respond_with(ResponseTemplate::new(200).set_body_string("800005"))
        .mount(&server)
        .await;

    assert_eq!(ledger_for(&server).tip_height().await.unwrap(), 800_005);
}

#[tokio::test]
async fn test_esplora_not_found_mock() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/tx/.*"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Transaction not found"))
        .mount(&server)
        .await;

    let tx_id = payment_txid(2);
    let err = ledger_for(&server).get_transaction(&tx_id).await.unwrap_err();
    assert_eq!(err, PaymentError::NotFound { tx_id });
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_esplora_rate_limited_mock() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/tx/.*"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let err = ledger_for(&server)
        .get_transaction(&payment_txid(3))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::RateLimited { retry_after_ms: 5000 }));
    assert!(err.is_retryable());

    let notary: NotaryError = err.into();
    assert!(notary.is_retryable());
    assert_eq!(notary.retry_after_ms(), Some(5000));
}

#[tokio::test]
async fn test_esplora_server_error_is_network_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/tx/.*"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = ledger_for(&server)
        .get_transaction(&payment_txid(4))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Network { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_verifier_over_esplora_counts_confirmations() {
    let server = MockServer::start().await;
    let tx_id = payment_txid(5);

    Mock::given(method("GET"))
        .and(path(format!("/tx/{}", tx_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(tx_body(
            &tx_id,
            serde_json::json!([
                {"value": 200_000_000u64, "scriptpubkey_address": PLATFORM_ADDRESS},
                {"value": 50_000_000u64, "scriptpubkey_address": PLATFORM_ADDRESS},
                {"value": 900_000_000u64, "scriptpubkey_address": "tb1qsomeoneelse"}
            ]),
            Some(100),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blocks/tip/height"))
        .respond_with(ResponseTemplate::new(200).set_body_string("102"))
        .mount(&server)
        .await;

    let verified = verifier_for(&server, Amount::from_units(1))
        .verify(&tx_id.to_uppercase())
        .await
        .unwrap();

    assert_eq!(verified.tx_id, tx_id);
    assert_eq!(verified.paid_amount, Amount::parse("2.5").unwrap());
    assert_eq!(verified.confirmations, Some(3));
}

#[tokio::test]
async fn test_verifier_over_esplora_rejects_underpayment() {
    let server = MockServer::start().await;
    let tx_id = payment_txid(6);

    Mock::given(method("GET"))
        .and(path(format!("/tx/{}", tx_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(tx_body(
            &tx_id,
            serde_json::json!([
                {"value": 10_000u64, "scriptpubkey_address": PLATFORM_ADDRESS}
            ]),
            None,
        )))
        .mount(&server)
        .await;

    let err = verifier_for(&server, Amount::from_units(1))
        .verify(&tx_id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Underpaid { .. }));
}

#[tokio::test]
async fn test_verifier_pending_payment_has_zero_confirmations() {
    let server = MockServer::start().await;
    let tx_id = payment_txid(7);

    Mock::given(method("GET"))
        .and(path(format!("/tx/{}", tx_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(tx_body(
            &tx_id,
            serde_json::json!([
                {"value": 100_000_000u64, "scriptpubkey_address": PLATFORM_ADDRESS}
            ]),
            None,
        )))
        .mount(&server)
        .await;

    let verified = verifier_for(&server, Amount::from_units(1))
        .verify(&tx_id)
        .await
        .unwrap();
    assert_eq!(verified.confirmations, Some(0));
}

#[tokio::test]
async fn test_verifier_rejects_malformed_id_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = verifier_for(&server, Amount::from_units(1))
        .verify("not-a-txid")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::MalformedId { .. }));
}

#[tokio::test]
async fn test_esplora_unreachable_server() {
    let config = EsploraConfig::new("http://127.0.0.1:1").with_timeout(2);
    let ledger = EsploraLedger::new(config).unwrap();

    let err = ledger.get_transaction(&payment_txid(8)).await.unwrap_err();
    assert!(matches!(err, PaymentError::Network { .. }));
}

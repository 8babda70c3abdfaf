//! File-backed storage tests.
//!
//! Each test works in its own temporary directory.

#![cfg(feature = "file-storage")]

use std::sync::Arc;

use chrono::Utc;
use formproof_lib::canonical::fingerprint_text;
use formproof_lib::credits::{
    AccessToken, CreditLedger, CreditPolicy, CreditStore, FileCreditStore, InsertOutcome,
};
use formproof_lib::persistence::{Persistence, StorageConfig};
use formproof_lib::records::{FileRecordStore, NotarizationRecord, RecordStore};
use formproof_lib::{Amount, NotaryError, TokenId};
use serde_json::json;
use tempfile::TempDir;

fn token(tx: &str, credits: u64) -> AccessToken {
    AccessToken::new(
        TokenId::generate(),
        tx.to_string(),
        Amount::from_units(credits),
        credits,
        Utc::now(),
    )
}

#[tokio::test]
async fn test_credit_file_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let original = token("tx-reopen", 3);

    {
        let store = FileCreditStore::new(dir.path()).unwrap();
        assert_eq!(
            store.insert_unique(&original).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.try_debit(&original.id, 1, Utc::now()).await.unwrap(),
            Some(2)
        );
    }

    let reopened = FileCreditStore::new(dir.path()).unwrap();
    assert!(reopened.data_path().exists());
    let loaded = reopened.get(&original.id).await.unwrap().unwrap();
    assert_eq!(loaded.remaining_credits, 2);
    assert!(loaded.last_used_at.is_some());

    // Uniqueness holds across handles, by payment and by id.
    assert_eq!(
        reopened.insert_unique(&token("tx-reopen", 9)).await.unwrap(),
        InsertOutcome::PaymentClaimed
    );
    let mut same_id = token("tx-other", 1);
    same_id.id = original.id.clone();
    assert_eq!(
        reopened.insert_unique(&same_id).await.unwrap(),
        InsertOutcome::IdTaken
    );
    assert!(reopened.id_exists(&original.id).await.unwrap());
    assert_eq!(
        reopened
            .find_by_payment("tx-reopen")
            .await
            .unwrap()
            .map(|t| t.id),
        Some(original.id)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_file_debits_across_handles() {
    let dir = TempDir::new().unwrap();
    let seed = token("tx-race", 6);
    FileCreditStore::new(dir.path())
        .unwrap()
        .insert_unique(&seed)
        .await
        .unwrap();

    // A separate store per task, as separate processes would have.
    let handles: Vec<_> = (0..12)
        .map(|_| {
            let path = dir.path().to_path_buf();
            let id = seed.id.clone();
            tokio::spawn(async move {
                let store = FileCreditStore::new(&path).unwrap();
                store.try_debit(&id, 1, Utc::now()).await.unwrap()
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            successes += 1;
        }
    }
    assert_eq!(successes, 6);

    let store = FileCreditStore::new(dir.path()).unwrap();
    assert_eq!(store.get(&seed.id).await.unwrap().unwrap().remaining_credits, 0);
}

#[tokio::test]
async fn test_file_refund_and_disable() {
    let dir = TempDir::new().unwrap();
    let store = FileCreditStore::new(dir.path()).unwrap();
    let t = token("tx-refund", 2);
    store.insert_unique(&t).await.unwrap();

    store.try_debit(&t.id, 2, Utc::now()).await.unwrap();
    assert_eq!(store.refund(&t.id, 5).await.unwrap(), Some(2));

    assert!(store.set_inactive(&t.id).await.unwrap());
    assert_eq!(store.try_debit(&t.id, 1, Utc::now()).await.unwrap(), None);
    assert!(!store.set_inactive(&TokenId::generate()).await.unwrap());
}

#[tokio::test]
async fn test_record_file_keeps_duplicates_earliest_first() {
    let dir = TempDir::new().unwrap();
    let store = FileRecordStore::new(dir.path()).unwrap();
    let fp = fingerprint_text("duplicate submission");

    let first = store
        .put(NotarizationRecord::new(fp.clone(), json!({"n": 1}), None))
        .await
        .unwrap();
    let second = store
        .put(NotarizationRecord::new(
            fp.clone(),
            json!({"n": 2}),
            Some("ab".repeat(32)),
        ))
        .await
        .unwrap();
    assert_ne!(first, second);

    let reopened = FileRecordStore::new(dir.path()).unwrap();
    let earliest = reopened.get(&fp).await.unwrap().unwrap();
    assert_eq!(earliest.record_id, first);
    assert_eq!(earliest.metadata["n"], 1);

    let all = reopened.find_all(&fp).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].anchor_tx_id.as_deref(), Some("ab".repeat(32).as_str()));

    assert!(reopened
        .get(&fingerprint_text("never stored"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_corrupt_credit_file_is_internal_error() {
    let dir = TempDir::new().unwrap();
    let store = FileCreditStore::new(dir.path()).unwrap();
    std::fs::write(store.data_path(), "{not json").unwrap();

    let err = store.get(&TokenId::generate()).await.unwrap_err();
    assert!(matches!(err, NotaryError::Internal(_)));
}

#[tokio::test]
async fn test_persistence_open_file_backend() {
    let dir = TempDir::new().unwrap();
    let persistence = Persistence::open(&StorageConfig::file(dir.path())).unwrap();

    let ledger = CreditLedger::new(persistence.credits(), CreditPolicy::default());
    let issued = ledger
        .issue("tx-persisted", Amount::from_units(4))
        .await
        .unwrap();
    ledger.consume(issued.id.as_str(), 1).await.unwrap();

    // A second open over the same directory sees the same state.
    let again = Persistence::open(&StorageConfig::file(dir.path())).unwrap();
    let ledger = CreditLedger::new(again.credits(), CreditPolicy::default());
    assert_eq!(
        ledger.status(issued.id.as_str()).await.unwrap().remaining_credits,
        3
    );
    let err = ledger
        .issue("tx-persisted", Amount::from_units(4))
        .await
        .unwrap_err();
    assert!(matches!(err, NotaryError::Conflict { .. }));

    let records: Arc<dyn RecordStore> = again.records();
    let fp = fingerprint_text("persisted");
    records
        .put(NotarizationRecord::new(fp.clone(), json!({}), None))
        .await
        .unwrap();
    assert!(persistence.records().get(&fp).await.unwrap().is_some());
}

#[test]
fn test_file_backend_requires_path() {
    let config = StorageConfig {
        path: None,
        ..StorageConfig::file("unused")
    };
    assert!(Persistence::open(&config).is_err());
}

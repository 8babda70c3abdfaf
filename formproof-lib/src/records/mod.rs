//! Notarization record store.
//!
//! Pure storage of `(fingerprint, metadata)` pairs. Authorization (credit
//! debit, payment) is the service layer's job; `put` itself accepts any
//! well-formed fingerprint. Fingerprints are not a storage key: identical
//! submissions produce duplicate records, and lookups return the earliest.

#[cfg(feature = "file-storage")]
mod file_store;

#[cfg(feature = "file-storage")]
pub use file_store::FileRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::canonical::Fingerprint;
use crate::{NotaryError, Result};

/// A stored notarization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationRecord {
    /// Store-assigned id.
    pub record_id: String,
    /// Fingerprint of the notarized data.
    pub fingerprint: Fingerprint,
    /// Opaque application-supplied descriptor.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Anchoring transaction, when one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_tx_id: Option<String>,
    /// Storage time.
    pub stored_at: DateTime<Utc>,
}

impl NotarizationRecord {
    /// New record with a fresh id, stamped now.
    pub fn new(
        fingerprint: Fingerprint,
        metadata: serde_json::Value,
        anchor_tx_id: Option<String>,
    ) -> Self {
        Self {
            record_id: format!("rec_{}", uuid::Uuid::new_v4().simple()),
            fingerprint,
            metadata,
            anchor_tx_id,
            stored_at: Utc::now(),
        }
    }
}

/// Storage for notarization records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a record; returns its id.
    async fn put(&self, record: NotarizationRecord) -> Result<String>;

    /// Earliest record for a fingerprint.
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<NotarizationRecord>>;

    /// Every record for a fingerprint, oldest first.
    async fn find_all(&self, fingerprint: &Fingerprint) -> Result<Vec<NotarizationRecord>>;
}

/// In-memory record store; insertion order is storage order.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<NotarizationRecord>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<NotarizationRecord>>> {
        self.records
            .read()
            .map_err(|e| NotaryError::Internal(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put(&self, record: NotarizationRecord) -> Result<String> {
        let mut records = self
            .records
            .write()
            .map_err(|e| NotaryError::Internal(format!("Lock poisoned: {}", e)))?;
        let id = record.record_id.clone();
        records.push(record);
        Ok(id)
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<NotarizationRecord>> {
        Ok(self
            .read()?
            .iter()
            .find(|r| &r.fingerprint == fingerprint)
            .cloned())
    }

    async fn find_all(&self, fingerprint: &Fingerprint) -> Result<Vec<NotarizationRecord>> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| &r.fingerprint == fingerprint)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::fingerprint_text;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryRecordStore::new();
        let fp = fingerprint_text("hello");
        let id = store
            .put(NotarizationRecord::new(fp.clone(), json!({"source": "form-1"}), None))
            .await
            .unwrap();
        assert!(id.starts_with("rec_"));

        let record = store.get(&fp).await.unwrap().unwrap();
        assert_eq!(record.record_id, id);
        assert_eq!(record.metadata["source"], "form-1");

        assert!(store
            .get(&fingerprint_text("other"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicates_allowed_earliest_wins() {
        let store = InMemoryRecordStore::new();
        let fp = fingerprint_text("same");
        let first = store
            .put(NotarizationRecord::new(fp.clone(), json!({"n": 1}), None))
            .await
            .unwrap();
        store
            .put(NotarizationRecord::new(fp.clone(), json!({"n": 2}), None))
            .await
            .unwrap();

        assert_eq!(store.get(&fp).await.unwrap().unwrap().record_id, first);
        let all = store.find_all(&fp).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].metadata["n"], 2);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = NotarizationRecord::new(
            fingerprint_text("x"),
            json!(null),
            Some("ab".into()),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("recordId").is_some());
        assert!(value.get("storedAt").is_some());
        assert_eq!(value["anchorTxId"], "ab");
    }
}

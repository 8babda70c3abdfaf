//! File-backed record store (requires the `file-storage` feature).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{NotarizationRecord, RecordStore};
use crate::canonical::Fingerprint;
use crate::file_lock::{io_error, read_json, with_exclusive_lock, write_json};
use crate::Result;

const DATA_FILE: &str = "records.json";
const LOCK_FILE: &str = "records.lock";

/// Record store persisted as a JSON array in storage order.
pub struct FileRecordStore {
    data_path: PathBuf,
    lock_path: PathBuf,
}

impl FileRecordStore {
    /// Open (or create) a store in `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| io_error("cannot create", dir, e))?;
        Ok(Self {
            data_path: dir.join(DATA_FILE),
            lock_path: dir.join(LOCK_FILE),
        })
    }

    async fn load(&self) -> Result<Vec<NotarizationRecord>> {
        with_exclusive_lock(&self.lock_path, || read_json(&self.data_path)).await
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn put(&self, record: NotarizationRecord) -> Result<String> {
        with_exclusive_lock(&self.lock_path, || {
            let mut records: Vec<NotarizationRecord> = read_json(&self.data_path)?;
            let id = record.record_id.clone();
            records.push(record);
            write_json(&self.data_path, &records)?;
            Ok(id)
        })
        .await
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<NotarizationRecord>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| &r.fingerprint == fingerprint))
    }

    async fn find_all(&self, fingerprint: &Fingerprint) -> Result<Vec<NotarizationRecord>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|r| &r.fingerprint == fingerprint)
            .collect())
    }
}

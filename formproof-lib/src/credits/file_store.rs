//! File-backed credit store (requires the `file-storage` feature).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::store::{CreditStore, InsertOutcome};
use super::token::{AccessToken, TokenId};
use crate::file_lock::{io_error, read_json, with_exclusive_lock, write_json};
use crate::Result;

const DATA_FILE: &str = "credits.json";
const LOCK_FILE: &str = "credits.lock";

#[derive(Default, Serialize, Deserialize)]
struct CreditFile {
    tokens: BTreeMap<String, AccessToken>,
}

impl CreditFile {
    fn find_by_payment(&self, payment_tx_id: &str) -> Option<&AccessToken> {
        self.tokens
            .values()
            .find(|t| t.payment_tx_id == payment_tx_id)
    }
}

/// Credit store persisted as a single JSON document.
///
/// Every operation, reads included, holds an exclusive fs2 lock for its
/// whole read-modify-write cycle, which makes the unique insert and the
/// conditional decrement atomic across handles and processes.
pub struct FileCreditStore {
    data_path: PathBuf,
    lock_path: PathBuf,
}

impl FileCreditStore {
    /// Open (or create) a store in `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| io_error("cannot create", dir, e))?;
        Ok(Self {
            data_path: dir.join(DATA_FILE),
            lock_path: dir.join(LOCK_FILE),
        })
    }

    /// Path of the JSON document.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    async fn read<T>(&self, f: impl FnOnce(&CreditFile) -> T + Send) -> Result<T> {
        with_exclusive_lock(&self.lock_path, || {
            let file: CreditFile = read_json(&self.data_path)?;
            Ok(f(&file))
        })
        .await
    }

    /// Apply `f`; the document is rewritten only when `f` reports a change.
    async fn update<T>(&self, f: impl FnOnce(&mut CreditFile) -> (T, bool) + Send) -> Result<T> {
        with_exclusive_lock(&self.lock_path, || {
            let mut file: CreditFile = read_json(&self.data_path)?;
            let (out, changed) = f(&mut file);
            if changed {
                write_json(&self.data_path, &file)?;
            }
            Ok(out)
        })
        .await
    }
}

#[async_trait]
impl CreditStore for FileCreditStore {
    async fn insert_unique(&self, token: &AccessToken) -> Result<InsertOutcome> {
        self.update(|file| {
            if file.find_by_payment(&token.payment_tx_id).is_some() {
                return (InsertOutcome::PaymentClaimed, false);
            }
            if file.tokens.contains_key(token.id.as_str()) {
                return (InsertOutcome::IdTaken, false);
            }
            file.tokens
                .insert(token.id.as_str().to_string(), token.clone());
            (InsertOutcome::Inserted, true)
        })
        .await
    }

    async fn id_exists(&self, id: &TokenId) -> Result<bool> {
        self.read(|file| file.tokens.contains_key(id.as_str())).await
    }

    async fn find_by_payment(&self, payment_tx_id: &str) -> Result<Option<AccessToken>> {
        self.read(|file| file.find_by_payment(payment_tx_id).cloned())
            .await
    }

    async fn get(&self, id: &TokenId) -> Result<Option<AccessToken>> {
        self.read(|file| file.tokens.get(id.as_str()).cloned())
            .await
    }

    async fn try_debit(&self, id: &TokenId, n: u64, now: DateTime<Utc>) -> Result<Option<u64>> {
        self.update(|file| {
            match file
                .tokens
                .get_mut(id.as_str())
                .and_then(|token| token.apply_debit(n, now))
            {
                Some(remaining) => (Some(remaining), n > 0),
                None => (None, false),
            }
        })
        .await
    }

    async fn refund(&self, id: &TokenId, n: u64) -> Result<Option<u64>> {
        self.update(|file| match file.tokens.get_mut(id.as_str()) {
            Some(token) => (Some(token.apply_refund(n)), true),
            None => (None, false),
        })
        .await
    }

    async fn set_inactive(&self, id: &TokenId) -> Result<bool> {
        self.update(|file| match file.tokens.get_mut(id.as_str()) {
            Some(token) if token.active => {
                token.active = false;
                (true, true)
            }
            Some(_) => (true, false),
            None => (false, false),
        })
        .await
    }
}

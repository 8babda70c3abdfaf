//! Process-wide persistence handle.
//!
//! Request handlers share one pair of stores (credits and records). The
//! handle has an explicit lifecycle:
//!
//! - [`init`] opens the configured backend the first time it is called and
//!   returns the same handle on every later call, including concurrent
//!   first calls racing each other.
//! - [`handle`] returns the current handle or fails if none is open.
//! - [`shutdown`] drops the global handle; a later [`init`] opens a new one.
//!
//! Components that want explicit wiring (tests, embedders) can skip the
//! global entirely and use [`Persistence::open`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::credits::{CreditStore, InMemoryCreditStore};
use crate::records::{InMemoryRecordStore, RecordStore};
use crate::{NotaryError, Result};

/// Storage backend selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on exit.
    #[default]
    Memory,
    /// JSON files under `path` (requires `file-storage`).
    File,
}

/// `[storage]` configuration section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the file backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// In-memory storage.
    pub fn memory() -> Self {
        Self::default()
    }

    /// File storage rooted at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::File,
            path: Some(path.into()),
        }
    }
}

/// The shared stores.
#[derive(Clone)]
pub struct Persistence {
    credits: Arc<dyn CreditStore>,
    records: Arc<dyn RecordStore>,
}

impl Persistence {
    /// Wrap existing stores.
    pub fn new(credits: Arc<dyn CreditStore>, records: Arc<dyn RecordStore>) -> Self {
        Self { credits, records }
    }

    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCreditStore::new()),
            Arc::new(InMemoryRecordStore::new()),
        )
    }

    /// Open the configured backend.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::File => Self::open_files(config),
        }
    }

    #[cfg(feature = "file-storage")]
    fn open_files(config: &StorageConfig) -> Result<Self> {
        let dir = config.path.as_ref().ok_or_else(|| {
            NotaryError::validation("storage.path", "required for the file backend")
        })?;
        Ok(Self::new(
            Arc::new(crate::credits::FileCreditStore::new(dir)?),
            Arc::new(crate::records::FileRecordStore::new(dir)?),
        ))
    }

    #[cfg(not(feature = "file-storage"))]
    fn open_files(_config: &StorageConfig) -> Result<Self> {
        Err(NotaryError::Unimplemented(
            "file storage not compiled - enable the 'file-storage' feature",
        ))
    }

    /// Credit store.
    pub fn credits(&self) -> Arc<dyn CreditStore> {
        self.credits.clone()
    }

    /// Record store.
    pub fn records(&self) -> Arc<dyn RecordStore> {
        self.records.clone()
    }
}

static GLOBAL: Mutex<Option<Arc<Persistence>>> = Mutex::new(None);

fn global() -> Result<std::sync::MutexGuard<'static, Option<Arc<Persistence>>>> {
    GLOBAL
        .lock()
        .map_err(|e| NotaryError::Internal(format!("Lock poisoned: {}", e)))
}

/// Open the process-wide handle, or return the one already open.
///
/// Only the first successful call's configuration takes effect.
pub fn init(config: &StorageConfig) -> Result<Arc<Persistence>> {
    let mut slot = global()?;
    if let Some(existing) = slot.as_ref() {
        debug!("persistence already initialized");
        return Ok(existing.clone());
    }
    let opened = Arc::new(Persistence::open(config)?);
    *slot = Some(opened.clone());
    info!(backend = ?config.backend, "persistence initialized");
    Ok(opened)
}

/// The process-wide handle.
///
/// # Errors
///
/// Returns an internal error if [`init`] has not been called.
pub fn handle() -> Result<Arc<Persistence>> {
    global()?
        .clone()
        .ok_or_else(|| NotaryError::Internal("persistence not initialized".to_string()))
}

/// Drop the process-wide handle. Returns whether one was open.
pub fn shutdown() -> Result<bool> {
    let closed = global()?.take().is_some();
    if closed {
        info!("persistence shut down");
    }
    Ok(closed)
}

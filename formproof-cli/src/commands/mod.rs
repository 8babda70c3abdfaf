//! CLI command implementations

pub mod config;
pub mod credits;
pub mod fingerprint;
pub mod normalize;
pub mod payment;
pub mod records;

use anyhow::{Context as _, Result};
use formproof_lib::errors::RESOURCE_TRANSACTION;
use formproof_lib::payment::EsploraLedger;
use formproof_lib::persistence::{self, StorageConfig};
use formproof_lib::{NotaryConfig, NotaryError, NotaryService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ui;

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formproof")
        .join("config.toml")
}

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formproof")
}

/// Resolved configuration shared by every command.
pub struct Context {
    pub config: NotaryConfig,
    pub data_dir: PathBuf,
    pub verbose: bool,
}

impl Context {
    /// Load the configuration and settle the data directory.
    ///
    /// An explicit data directory wins over the configured storage path.
    /// The CLI always uses the file backend.
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => NotaryConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    NotaryConfig::load(&path)
                        .with_context(|| format!("Failed to load config {}", path.display()))?
                } else {
                    NotaryConfig::default()
                }
            }
        };

        let data_dir = data_dir
            .or_else(|| config.storage.path.clone())
            .unwrap_or_else(default_data_dir);
        config.storage = StorageConfig::file(&data_dir);
        config.validate().context("Invalid configuration")?;

        tracing::debug!(data_dir = %data_dir.display(), "configuration loaded");
        Ok(Self {
            config,
            data_dir,
            verbose,
        })
    }

    /// Open persistence and assemble the notary service.
    pub fn service(&self) -> Result<NotaryService> {
        let persistence = persistence::init(&self.config.storage)
            .with_context(|| format!("Failed to open data directory {}", self.data_dir.display()))?;
        let ledger = Arc::new(EsploraLedger::new(self.config.esplora.clone())?);
        Ok(NotaryService::from_config(
            &self.config,
            &persistence,
            ledger,
        )?)
    }
}

/// Print a hint for failures the user can act on, then hand the error back.
pub fn explain(err: NotaryError) -> anyhow::Error {
    match &err {
        NotaryError::NotFound { resource_type, .. } if resource_type == RESOURCE_TRANSACTION => {
            ui::info("The transaction may not have propagated yet; try again in a few minutes");
        }
        NotaryError::InsufficientBalance { .. } => {
            ui::info("Top up with a new payment to get more credits");
        }
        NotaryError::Disabled { .. } => {
            ui::info("This token was disabled by the operator");
        }
        _ if err.is_retryable() => match err.retry_after_ms() {
            Some(ms) => ui::warning(&format!("Temporary failure; retry in {}s", ms.div_ceil(1000))),
            None => ui::warning("Temporary failure; retry shortly"),
        },
        _ => {}
    }
    err.into()
}

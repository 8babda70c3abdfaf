//! Notary configuration.
//!
//! Loaded from TOML; every section and field has a default so a minimal
//! file only names the receiving address:
//!
//! ```toml
//! [payment]
//! receiving_address = "bc1q..."
//! explorer_tx_url = "https://mempool.space/tx/{txid}"
//!
//! [credits]
//! rate = "1"
//! minimum_payment = "1"
//!
//! [esplora]
//! api_url = "https://mempool.space/api"
//!
//! [storage]
//! backend = "file"
//! path = "/var/lib/formproof"
//!
//! [notifier]
//! backend = "log"
//!
//! [tabular]
//! mode = "explicit"
//! fields = ["Timestamp"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::credits::CreditPolicy;
use crate::notify::{NotifierConfig, NotifierKind};
use crate::payment::{EsploraConfig, PaymentConfig};
use crate::persistence::{StorageBackend, StorageConfig};
use crate::tabular::ExclusionPolicy;
use crate::{NotaryError, Result};

/// Per-call time budgets for external collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Budget for each persistence call, in milliseconds.
    #[serde(default = "default_persistence_ms")]
    pub persistence_ms: u64,
    /// Budget for each ledger query, in milliseconds.
    #[serde(default = "default_ledger_ms")]
    pub ledger_ms: u64,
}

fn default_persistence_ms() -> u64 {
    5000
}

fn default_ledger_ms() -> u64 {
    15_000
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            persistence_ms: default_persistence_ms(),
            ledger_ms: default_ledger_ms(),
        }
    }
}

impl TimeoutsConfig {
    /// Persistence budget.
    pub fn persistence(&self) -> Duration {
        Duration::from_millis(self.persistence_ms)
    }

    /// Ledger query budget.
    pub fn ledger(&self) -> Duration {
        Duration::from_millis(self.ledger_ms)
    }
}

/// Complete notary configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// Exchange rate, minimum payment and id attempts.
    #[serde(default)]
    pub credits: CreditPolicy,
    /// Receiving address and ledger formats.
    #[serde(default)]
    pub payment: PaymentConfig,
    /// Ledger query service.
    #[serde(default)]
    pub esplora: EsploraConfig,
    /// Storage backend.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Notification backend.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Collaborator time budgets.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Field exclusion for tabular exports.
    #[serde(default)]
    pub tabular: ExclusionPolicy,
}

impl NotaryConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NotaryError::validation("config", e.message().to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NotaryError::validation("config", format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| NotaryError::Serialization(e.to_string()))
    }

    /// Reject configurations that cannot work.
    ///
    /// The receiving address is not checked here: tools that only
    /// fingerprint or inspect credentials run without one.
    pub fn validate(&self) -> Result<()> {
        self.credits.validate()?;
        self.payment.validate()?;
        if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
            return Err(NotaryError::validation(
                "storage.path",
                "required for the file backend",
            ));
        }
        if self.notifier.backend == NotifierKind::Webhook && self.notifier.webhook_url.is_none() {
            return Err(NotaryError::validation(
                "notifier.webhook_url",
                "required for the webhook backend",
            ));
        }
        if self.timeouts.persistence_ms == 0 || self.timeouts.ledger_ms == 0 {
            return Err(NotaryError::validation("timeouts", "must be greater than zero"));
        }
        Ok(())
    }

    /// Check that payment verification is possible.
    pub fn require_receiving_address(&self) -> Result<&str> {
        let address = self.payment.receiving_address.trim();
        if address.is_empty() {
            return Err(NotaryError::validation(
                "payment.receiving_address",
                "must be configured to verify payments",
            ));
        }
        Ok(address)
    }
}

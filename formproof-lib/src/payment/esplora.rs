//! Esplora ledger query backend.
//!
//! Connects to Esplora-compatible APIs (Blockstream, mempool.space) to look
//! up payment transactions and the chain tip.
//!
//! # Feature Flags
//!
//! This module requires the `http-executor` feature flag to be enabled for actual
//! HTTP requests. Without it, every query fails with a network error naming
//! the missing feature.
//!
//! ```toml
//! [dependencies]
//! formproof-lib = { version = "0.1", features = ["http-executor"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use formproof_lib::payment::{EsploraLedger, LedgerQuery};
//!
//! let ledger = EsploraLedger::blockstream_testnet()?;
//! let tx = ledger.get_transaction("ab12...").await?;
//! println!("{} outputs, height {:?}", tx.outputs.len(), tx.block_height);
//! ```

use async_trait::async_trait;
use serde::Deserialize;
#[cfg(feature = "http-executor")]
use std::time::Duration;

use super::config::EsploraConfig;
use super::{LedgerOutput, LedgerQuery, LedgerTransaction, PaymentError};
#[cfg(feature = "http-executor")]
use crate::NotaryError;
use crate::Result;

/// Esplora API client for read-only payment lookups.
pub struct EsploraLedger {
    config: EsploraConfig,
    #[cfg(feature = "http-executor")]
    client: reqwest::Client,
}

impl EsploraLedger {
    /// Create a new Esplora ledger client with the given configuration.
    #[cfg(feature = "http-executor")]
    pub fn new(config: EsploraConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotaryError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a new Esplora ledger client (stub when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    pub fn new(config: EsploraConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Create a client for Blockstream mainnet.
    pub fn blockstream_mainnet() -> Result<Self> {
        Self::new(EsploraConfig::blockstream_mainnet())
    }

    /// Create a client for Blockstream testnet.
    pub fn blockstream_testnet() -> Result<Self> {
        Self::new(EsploraConfig::blockstream_testnet())
    }

    /// Get the configuration.
    pub fn config(&self) -> &EsploraConfig {
        &self.config
    }

    /// Build the full URL for an API endpoint.
    #[cfg(any(feature = "http-executor", test))]
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Make a GET request to the API.
    #[cfg(feature = "http-executor")]
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        tx_id: Option<&str>,
    ) -> std::result::Result<T, PaymentError> {
        let url = self.url(path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.map_status_error(status.as_u16(), &error_text, tx_id));
        }

        response.json::<T>().await.map_err(|e| PaymentError::Network {
            reason: format!("Failed to parse Esplora response: {}", e),
        })
    }

    /// Make a GET request to the API (stub when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        _path: &str,
        _tx_id: Option<&str>,
    ) -> std::result::Result<T, PaymentError> {
        Err(PaymentError::Network {
            reason: "Esplora HTTP client not compiled - enable the 'http-executor' feature"
                .to_string(),
        })
    }

    /// Map HTTP status codes to the payment failure taxonomy.
    #[cfg(feature = "http-executor")]
    fn map_status_error(&self, status: u16, error_text: &str, tx_id: Option<&str>) -> PaymentError {
        match (status, tx_id) {
            (400, Some(_)) => PaymentError::MalformedId {
                reason: error_text.to_string(),
            },
            (404, Some(tx_id)) => PaymentError::NotFound {
                tx_id: tx_id.to_string(),
            },
            (429, _) => PaymentError::RateLimited {
                retry_after_ms: self.config.rate_limit_ms,
            },
            _ => PaymentError::Network {
                reason: format!("Esplora request failed ({}): {}", status, error_text),
            },
        }
    }

    /// Map reqwest errors to network failures.
    #[cfg(feature = "http-executor")]
    fn map_reqwest_error(&self, e: reqwest::Error) -> PaymentError {
        if e.is_timeout() {
            PaymentError::Network {
                reason: format!(
                    "Esplora request timed out after {}ms",
                    self.config.timeout_secs * 1000
                ),
            }
        } else if e.is_connect() {
            PaymentError::Network {
                reason: format!("cannot connect to {}: {}", self.config.api_url, e),
            }
        } else {
            PaymentError::Network {
                reason: format!("Esplora request failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl LedgerQuery for EsploraLedger {
    async fn get_transaction(
        &self,
        tx_id: &str,
    ) -> std::result::Result<LedgerTransaction, PaymentError> {
        let tx: EsploraTx = self.get(&format!("tx/{}", tx_id), Some(tx_id)).await?;
        Ok(tx.into())
    }

    async fn tip_height(&self) -> std::result::Result<u64, PaymentError> {
        self.get("blocks/tip/height", None).await
    }
}

// ============================================================================
// API Response Types
// ============================================================================

/// Transaction status.
#[derive(Clone, Debug, Deserialize)]
struct TxStatus {
    #[serde(default)]
    confirmed: bool,
    block_height: Option<u64>,
}

/// Transaction from Esplora API; only the fields payment checks need.
#[derive(Clone, Debug, Deserialize)]
struct EsploraTx {
    txid: String,
    status: TxStatus,
    #[serde(default)]
    vout: Vec<EsploraTxOutput>,
}

/// Transaction output.
#[derive(Clone, Debug, Deserialize)]
struct EsploraTxOutput {
    value: u64,
    scriptpubkey_address: Option<String>,
}

impl From<EsploraTx> for LedgerTransaction {
    fn from(tx: EsploraTx) -> Self {
        Self {
            tx_id: tx.txid,
            outputs: tx
                .vout
                .into_iter()
                .map(|out| LedgerOutput {
                    address: out.scriptpubkey_address,
                    value: out.value,
                })
                .collect(),
            block_height: if tx.status.confirmed {
                tx.status.block_height
            } else {
                None
            },
        }
    }
}

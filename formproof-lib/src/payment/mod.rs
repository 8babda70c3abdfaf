//! Payment verification.
//!
//! The [`PaymentVerifier`] answers a single question: did transaction Z pay
//! at least the configured minimum to the platform's receiving address?
//! The ledger itself is an opaque collaborator behind [`LedgerQuery`];
//! [`EsploraLedger`] is the HTTP-backed implementation.
//!
//! Failures keep the distinction callers need for retry decisions: a
//! transaction the ledger does not know yet is [`PaymentError::NotFound`]
//! (poll again later), never folded into a permanent rejection.

mod config;
mod esplora;

pub use config::{EsploraConfig, LedgerNetwork, PaymentConfig, TXID_PLACEHOLDER};
pub use esplora::EsploraLedger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{DependencyError, RESOURCE_TRANSACTION};
use crate::{Amount, NotaryError};

/// Name used for the ledger query service in dependency errors.
pub const LEDGER_SERVICE: &str = "ledger";

/// Payment verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Transaction unknown to the ledger; may not have propagated yet.
    #[error("transaction {tx_id} not found on the ledger yet")]
    NotFound {
        /// Transaction id
        tx_id: String,
    },

    /// The ledger query service asked us to back off.
    #[error("ledger query rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds
        retry_after_ms: u64,
    },

    /// Transport failure or timeout talking to the ledger query service.
    #[error("ledger query failed: {reason}")]
    Network {
        /// Underlying error message
        reason: String,
    },

    /// The transaction paid less than the minimum to the platform address.
    #[error("payment of {paid} is below the minimum of {minimum}")]
    Underpaid {
        /// Amount paid to the receiving address
        paid: Amount,
        /// Required minimum
        minimum: Amount,
    },

    /// The transaction id does not match the ledger's format.
    #[error("malformed transaction id: {reason}")]
    MalformedId {
        /// Why the id was rejected
        reason: String,
    },
}

impl PaymentError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::RateLimited { .. } | Self::Network { .. }
        )
    }
}

impl From<PaymentError> for NotaryError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound { tx_id } => NotaryError::not_found(RESOURCE_TRANSACTION, tx_id),
            PaymentError::RateLimited { retry_after_ms } => {
                NotaryError::Dependency(DependencyError::RateLimited {
                    service: LEDGER_SERVICE.to_string(),
                    retry_after_ms,
                })
            }
            PaymentError::Network { reason } => NotaryError::unavailable(LEDGER_SERVICE, reason),
            PaymentError::Underpaid { paid, minimum } => NotaryError::validation(
                "payment",
                format!("paid {} but the minimum is {}", paid, minimum),
            ),
            PaymentError::MalformedId { reason } => NotaryError::validation("txid", reason),
        }
    }
}

/// One transaction output as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOutput {
    /// Destination address, if the output script has one.
    pub address: Option<String>,
    /// Value in integer base units.
    pub value: u64,
}

/// A transaction as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction id.
    pub tx_id: String,
    /// Outputs in ledger order.
    pub outputs: Vec<LedgerOutput>,
    /// Height of the including block; `None` while unconfirmed.
    pub block_height: Option<u64>,
}

/// Read-only access to the external ledger query service.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Fetch a transaction with its outputs.
    async fn get_transaction(&self, tx_id: &str) -> Result<LedgerTransaction, PaymentError>;

    /// Current chain tip height.
    async fn tip_height(&self) -> Result<u64, PaymentError>;
}

/// A payment confirmed to the platform's receiving address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    /// Normalized (lowercase) transaction id.
    pub tx_id: String,
    /// Sum of outputs paid to the receiving address.
    pub paid_amount: Amount,
    /// Confirmation depth; omitted when the chain tip is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

/// Validate a transaction id against the ledger's fixed-length hex format.
///
/// Returns the id trimmed and lowercased.
pub fn normalize_tx_id(tx_id: &str, expected_len: usize) -> Result<String, PaymentError> {
    let tx_id = tx_id.trim();
    if tx_id.len() != expected_len {
        return Err(PaymentError::MalformedId {
            reason: format!(
                "expected {} hex characters, got {}",
                expected_len,
                tx_id.len()
            ),
        });
    }
    if !tx_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PaymentError::MalformedId {
            reason: "contains non-hex characters".to_string(),
        });
    }
    Ok(tx_id.to_ascii_lowercase())
}

/// Verifies that a transaction paid the platform.
pub struct PaymentVerifier {
    ledger: Arc<dyn LedgerQuery>,
    config: PaymentConfig,
    minimum: Amount,
    timeout: Duration,
}

impl PaymentVerifier {
    /// Create a verifier.
    ///
    /// `minimum` is the smallest accepted payment; `timeout` bounds each
    /// individual ledger query.
    pub fn new(
        ledger: Arc<dyn LedgerQuery>,
        config: PaymentConfig,
        minimum: Amount,
        timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            config,
            minimum,
            timeout,
        }
    }

    /// The payment configuration.
    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Verify that `tx_id` paid at least the minimum to the receiving address.
    ///
    /// Malformed ids are rejected before any ledger query.
    pub async fn verify(&self, tx_id: &str) -> Result<VerifiedPayment, PaymentError> {
        let tx_id = normalize_tx_id(tx_id, self.config.txid_length)?;

        let tx = self
            .bounded("get_transaction", self.ledger.get_transaction(&tx_id))
            .await?;

        let paid_base_units = tx
            .outputs
            .iter()
            .filter(|out| out.address.as_deref() == Some(self.config.receiving_address.as_str()))
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
            .ok_or_else(|| PaymentError::Network {
                reason: "ledger reported output values that overflow".to_string(),
            })?;
        let paid_amount = Amount::from_base_units(paid_base_units, self.config.decimals)
            .map_err(|e| PaymentError::Network {
                reason: e.to_string(),
            })?;

        if paid_amount < self.minimum {
            return Err(PaymentError::Underpaid {
                paid: paid_amount,
                minimum: self.minimum,
            });
        }

        let confirmations = match tx.block_height {
            None => Some(0),
            Some(height) => match self.bounded("tip_height", self.ledger.tip_height()).await {
                Ok(tip) => Some(tip.saturating_sub(height) + 1),
                Err(e) => {
                    warn!(tx_id = %tx_id, error = %e, "chain tip unavailable, omitting confirmations");
                    None
                }
            },
        };

        debug!(tx_id = %tx_id, paid = %paid_amount, ?confirmations, "payment verified");
        Ok(VerifiedPayment {
            tx_id,
            paid_amount,
            confirmations,
        })
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, PaymentError>
    where
        F: std::future::Future<Output = Result<T, PaymentError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(PaymentError::Network {
                    reason: format!(
                        "{} timed out after {}ms",
                        operation,
                        self.timeout.as_millis()
                    ),
                })
            })
    }
}

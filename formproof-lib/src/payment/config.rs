//! Configuration types for payment verification.

use serde::{Deserialize, Serialize};

use crate::{NotaryError, Result};

/// Placeholder substituted with the anchoring transaction id in proof URLs.
pub const TXID_PLACEHOLDER: &str = "{txid}";

/// Ledger network selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerNetwork {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network.
    Testnet,
    /// Signet.
    Signet,
    /// Local development network.
    Regtest,
}

impl LedgerNetwork {
    /// Get the network name as used by most APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Signet => "signet",
            Self::Regtest => "regtest",
        }
    }
}

/// Configuration for an Esplora-compatible ledger query service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsploraConfig {
    /// API base URL (e.g., `https://blockstream.info/api`).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Network the explorer is on.
    #[serde(default)]
    pub network: LedgerNetwork,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Suggested delay before retrying a rate-limited request, in milliseconds.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
}

fn default_api_url() -> String {
    "https://blockstream.info/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_rate_limit() -> u64 {
    5000
}

impl Default for EsploraConfig {
    fn default() -> Self {
        Self::blockstream_mainnet()
    }
}

impl EsploraConfig {
    /// Create a new Esplora configuration.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            network: LedgerNetwork::default(),
            timeout_secs: default_timeout(),
            rate_limit_ms: default_rate_limit(),
        }
    }

    /// Create config for Blockstream mainnet.
    pub fn blockstream_mainnet() -> Self {
        Self::new(default_api_url()).with_network(LedgerNetwork::Mainnet)
    }

    /// Create config for Blockstream testnet.
    pub fn blockstream_testnet() -> Self {
        Self::new("https://blockstream.info/testnet/api").with_network(LedgerNetwork::Testnet)
    }

    /// Create config for mempool.space mainnet.
    pub fn mempool_mainnet() -> Self {
        Self::new("https://mempool.space/api").with_network(LedgerNetwork::Mainnet)
    }

    /// Create config for mempool.space testnet.
    pub fn mempool_testnet() -> Self {
        Self::new("https://mempool.space/testnet/api").with_network(LedgerNetwork::Testnet)
    }

    /// Set the network.
    pub fn with_network(mut self, network: LedgerNetwork) -> Self {
        self.network = network;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Where payments are expected and how ledger amounts are interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// The platform's own receiving address.
    #[serde(default)]
    pub receiving_address: String,

    /// Fractional digits of ledger base units (8 for satoshis).
    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Explorer URL template for proof references; must contain `{txid}`.
    #[serde(default = "default_explorer_tx_url")]
    pub explorer_tx_url: String,

    /// Number of hex characters in a transaction id.
    #[serde(default = "default_txid_length")]
    pub txid_length: usize,
}

fn default_decimals() -> u32 {
    8
}

fn default_explorer_tx_url() -> String {
    "https://blockstream.info/tx/{txid}".to_string()
}

fn default_txid_length() -> usize {
    64
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl PaymentConfig {
    /// Create a payment configuration for a receiving address.
    pub fn new(receiving_address: impl Into<String>) -> Self {
        Self {
            receiving_address: receiving_address.into(),
            decimals: default_decimals(),
            explorer_tx_url: default_explorer_tx_url(),
            txid_length: default_txid_length(),
        }
    }

    /// Set the base-unit exponent.
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Set the explorer URL template.
    pub fn with_explorer_tx_url(mut self, template: impl Into<String>) -> Self {
        self.explorer_tx_url = template.into();
        self
    }

    /// Set the transaction id length.
    pub fn with_txid_length(mut self, len: usize) -> Self {
        self.txid_length = len;
        self
    }

    /// Resolvable proof reference for an anchoring transaction.
    pub fn proof_url(&self, tx_id: &str) -> String {
        self.explorer_tx_url.replace(TXID_PLACEHOLDER, tx_id)
    }

    /// Check the configuration for values that can never work.
    pub fn validate(&self) -> Result<()> {
        if !self.explorer_tx_url.contains(TXID_PLACEHOLDER) {
            return Err(NotaryError::validation(
                "payment.explorer_tx_url",
                format!("must contain the {} placeholder", TXID_PLACEHOLDER),
            ));
        }
        if self.txid_length == 0 {
            return Err(NotaryError::validation(
                "payment.txid_length",
                "must be greater than zero",
            ));
        }
        if self.decimals > 28 {
            return Err(NotaryError::validation(
                "payment.decimals",
                "at most 28 fractional digits are supported",
            ));
        }
        Ok(())
    }
}

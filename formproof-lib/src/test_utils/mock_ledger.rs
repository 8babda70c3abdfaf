//! Scriptable ledger query service.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::fixtures::PLATFORM_ADDRESS;
use crate::payment::{LedgerOutput, LedgerQuery, LedgerTransaction, PaymentError};

/// In-memory ledger with known transactions and an optional chain tip.
///
/// Without a tip, `tip_height` fails with a network error, which lets tests
/// exercise the "confirmations omitted" path.
#[derive(Default)]
pub struct MockLedger {
    transactions: RwLock<HashMap<String, LedgerTransaction>>,
    tip: Option<u64>,
    failure: RwLock<Option<PaymentError>>,
    calls: AtomicUsize,
}

impl MockLedger {
    /// Empty ledger without a chain tip.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain tip height.
    pub fn with_tip(mut self, height: u64) -> Self {
        self.tip = Some(height);
        self
    }

    /// Make a transaction known.
    pub fn add_transaction(&self, tx: LedgerTransaction) {
        self.transactions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tx.tx_id.to_ascii_lowercase(), tx);
    }

    /// Make a single-output payment to [`PLATFORM_ADDRESS`] known.
    pub fn add_payment(&self, tx_id: &str, base_units: u64, block_height: Option<u64>) {
        self.add_transaction(LedgerTransaction {
            tx_id: tx_id.to_string(),
            outputs: vec![LedgerOutput {
                address: Some(PLATFORM_ADDRESS.to_string()),
                value: base_units,
            }],
            block_height,
        });
    }

    /// Fail every transaction lookup with `error`.
    pub fn fail_with(&self, error: PaymentError) {
        *self.failure.write().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Stop failing lookups.
    pub fn clear_failure(&self) {
        *self.failure.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Number of queries received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerQuery for MockLedger {
    async fn get_transaction(&self, tx_id: &str) -> Result<LedgerTransaction, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .failure
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }
        self.transactions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tx_id.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| PaymentError::NotFound {
                tx_id: tx_id.to_string(),
            })
    }

    async fn tip_height(&self) -> Result<u64, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tip.ok_or_else(|| PaymentError::Network {
            reason: "tip unavailable".to_string(),
        })
    }
}

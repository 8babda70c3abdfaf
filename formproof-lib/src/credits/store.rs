//! Persistence contract for the credit ledger.
//!
//! All mutation goes through two atomic primitives: a unique insert on
//! issuance and a conditional decrement on debit. Implementations must
//! make each of them a single indivisible operation; the ledger never
//! reads a balance and writes it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::token::{AccessToken, TokenId};
use crate::{NotaryError, Result};

/// Outcome of a unique insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was stored.
    Inserted,
    /// Another credential already uses this id; nothing was stored.
    IdTaken,
    /// Another credential already claims this payment; nothing was stored.
    PaymentClaimed,
}

/// Storage for access tokens.
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Store a new token unless its id or payment is already used.
    ///
    /// Both uniqueness checks and the write form one atomic step.
    async fn insert_unique(&self, token: &AccessToken) -> Result<InsertOutcome>;

    /// Check whether a token id is already taken.
    async fn id_exists(&self, id: &TokenId) -> Result<bool>;

    /// Find the token minted by a payment, if any.
    async fn find_by_payment(&self, payment_tx_id: &str) -> Result<Option<AccessToken>>;

    /// Load a token.
    async fn get(&self, id: &TokenId) -> Result<Option<AccessToken>>;

    /// Atomically debit `n` credits if the token is active and holds at
    /// least `n`; stamps `last_used_at` when `n > 0`.
    ///
    /// Returns the remaining credits, or `None` when the token is missing,
    /// disabled or short of credits.
    async fn try_debit(&self, id: &TokenId, n: u64, now: DateTime<Utc>) -> Result<Option<u64>>;

    /// Atomically return `n` credits, capped at the issued total.
    ///
    /// Returns the new balance, or `None` when the token is missing.
    async fn refund(&self, id: &TokenId, n: u64) -> Result<Option<u64>>;

    /// Clear the active flag. Returns `false` when the token is missing.
    async fn set_inactive(&self, id: &TokenId) -> Result<bool>;
}

#[derive(Default)]
struct Tables {
    tokens: HashMap<TokenId, AccessToken>,
    by_payment: HashMap<String, TokenId>,
}

/// In-memory credit store.
///
/// A single `RwLock` guards both the token table and the payment index so
/// the unique insert and the conditional decrement are each one critical
/// section.
#[derive(Default)]
pub struct InMemoryCreditStore {
    tables: RwLock<Tables>,
}

impl InMemoryCreditStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.tokens.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| NotaryError::Internal(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| NotaryError::Internal(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl CreditStore for InMemoryCreditStore {
    async fn insert_unique(&self, token: &AccessToken) -> Result<InsertOutcome> {
        let mut tables = self.write()?;
        if tables.by_payment.contains_key(&token.payment_tx_id) {
            return Ok(InsertOutcome::PaymentClaimed);
        }
        if tables.tokens.contains_key(&token.id) {
            return Ok(InsertOutcome::IdTaken);
        }
        tables
            .by_payment
            .insert(token.payment_tx_id.clone(), token.id.clone());
        tables.tokens.insert(token.id.clone(), token.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn id_exists(&self, id: &TokenId) -> Result<bool> {
        Ok(self.read()?.tokens.contains_key(id))
    }

    async fn find_by_payment(&self, payment_tx_id: &str) -> Result<Option<AccessToken>> {
        let tables = self.read()?;
        Ok(tables
            .by_payment
            .get(payment_tx_id)
            .and_then(|id| tables.tokens.get(id))
            .cloned())
    }

    async fn get(&self, id: &TokenId) -> Result<Option<AccessToken>> {
        Ok(self.read()?.tokens.get(id).cloned())
    }

    async fn try_debit(&self, id: &TokenId, n: u64, now: DateTime<Utc>) -> Result<Option<u64>> {
        let mut tables = self.write()?;
        Ok(tables
            .tokens
            .get_mut(id)
            .and_then(|token| token.apply_debit(n, now)))
    }

    async fn refund(&self, id: &TokenId, n: u64) -> Result<Option<u64>> {
        let mut tables = self.write()?;
        Ok(tables.tokens.get_mut(id).map(|token| token.apply_refund(n)))
    }

    async fn set_inactive(&self, id: &TokenId) -> Result<bool> {
        let mut tables = self.write()?;
        match tables.tokens.get_mut(id) {
            Some(token) => {
                token.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

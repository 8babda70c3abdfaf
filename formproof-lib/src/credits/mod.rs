//! Prepaid credit ledger.
//!
//! Issues one access token per verified payment and debits it atomically.
//!
//! # Invariants
//!
//! - A payment transaction mints at most one token (unique insert).
//! - `0 <= remaining_credits <= total_credits` at all times; under any
//!   interleaving of concurrent debits the successful debits never sum to
//!   more than `total_credits` (single conditional decrement in the store).
//! - Credential strings that do not match the `ak_` pattern are rejected
//!   before the store is touched.
//! - Every store call is bounded by the persistence timeout.

#[cfg(feature = "file-storage")]
mod file_store;
mod store;
mod token;

#[cfg(feature = "file-storage")]
pub use file_store::FileCreditStore;
pub use store::{CreditStore, InMemoryCreditStore, InsertOutcome};
pub use token::{AccessToken, TokenId, TokenStatus, TOKEN_BODY_LEN, TOKEN_PREFIX};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::RESOURCE_ACCESS_TOKEN;
use crate::notify::{NoopNotifier, Notification, Notifier};
use crate::{bounded, Amount, NotaryError, Result};

/// Default persistence timeout for ledger operations.
pub const DEFAULT_PERSISTENCE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Published issuance constants: exchange rate and minimum payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPolicy {
    /// Credits granted per paid unit.
    #[serde(default = "default_rate")]
    pub rate: Decimal,

    /// Smallest payment that can mint a credential.
    #[serde(default = "default_minimum_payment")]
    pub minimum_payment: Amount,

    /// Candidate ids tried before issuance gives up.
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: u32,
}

fn default_rate() -> Decimal {
    Decimal::ONE
}

fn default_minimum_payment() -> Amount {
    Amount::from_units(1)
}

fn default_max_id_attempts() -> u32 {
    5
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            minimum_payment: default_minimum_payment(),
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

impl CreditPolicy {
    /// Set the exchange rate.
    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = rate;
        self
    }

    /// Set the minimum payment.
    pub fn with_minimum_payment(mut self, minimum: Amount) -> Self {
        self.minimum_payment = minimum;
        self
    }

    /// Credits bought by `paid`.
    pub fn credits_for(&self, paid: &Amount) -> u64 {
        paid.credits_at_rate(self.rate)
    }

    /// Reject policies that could never issue a credential.
    pub fn validate(&self) -> Result<()> {
        if self.rate <= Decimal::ZERO {
            return Err(NotaryError::validation("credits.rate", "must be positive"));
        }
        // Deserialized amounts skip the sign check in `Amount::parse`
        if self.minimum_payment.as_decimal() <= Decimal::ZERO {
            return Err(NotaryError::validation(
                "credits.minimum_payment",
                "must be positive",
            ));
        }
        if self.max_id_attempts == 0 {
            return Err(NotaryError::validation(
                "credits.max_id_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

type IdSource = Arc<dyn Fn() -> TokenId + Send + Sync>;

/// Issues, debits and inspects access tokens.
pub struct CreditLedger {
    store: Arc<dyn CreditStore>,
    policy: CreditPolicy,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    id_source: IdSource,
}

impl CreditLedger {
    /// Create a ledger over `store`.
    pub fn new(store: Arc<dyn CreditStore>, policy: CreditPolicy) -> Self {
        Self {
            store,
            policy,
            notifier: Arc::new(NoopNotifier),
            timeout: DEFAULT_PERSISTENCE_TIMEOUT,
            id_source: Arc::new(TokenId::generate),
        }
    }

    /// Use `notifier` for issuance notices.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Bound every store call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the candidate id generator.
    pub fn with_id_source(mut self, source: impl Fn() -> TokenId + Send + Sync + 'static) -> Self {
        self.id_source = Arc::new(source);
        self
    }

    /// The issuance policy.
    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    /// Mint a credential for a verified payment.
    ///
    /// # Errors
    ///
    /// - `Validation` if `paid_amount` is below the minimum or buys no credits
    /// - `Conflict` if the payment already minted a credential
    /// - `IdSpaceExhausted` if every candidate id collided
    /// - `Dependency` if the final insert fails or times out
    pub async fn issue(&self, payment_tx_id: &str, paid_amount: Amount) -> Result<AccessToken> {
        if paid_amount < self.policy.minimum_payment {
            return Err(NotaryError::validation(
                "paid amount",
                format!(
                    "{} is below the minimum payment of {}",
                    paid_amount, self.policy.minimum_payment
                ),
            ));
        }

        let claimed = bounded(
            "credits.find_by_payment",
            self.timeout,
            self.store.find_by_payment(payment_tx_id),
        )
        .await?;
        if claimed.is_some() {
            return Err(NotaryError::Conflict {
                tx_id: payment_tx_id.to_string(),
            });
        }

        let total_credits = self.policy.credits_for(&paid_amount);
        if total_credits == 0 {
            return Err(NotaryError::validation(
                "paid amount",
                format!("{} buys no credits at rate {}", paid_amount, self.policy.rate),
            ));
        }

        let mut lookup_failures = 0;
        let mut last_lookup_error = None;
        for attempt in 1..=self.policy.max_id_attempts {
            let candidate = (self.id_source)();

            match bounded("credits.id_exists", self.timeout, self.store.id_exists(&candidate)).await {
                Ok(false) => {}
                Ok(true) => {
                    warn!(attempt, "candidate access token id collided, retrying");
                    continue;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "id availability check failed, retrying");
                    lookup_failures += 1;
                    last_lookup_error = Some(e);
                    continue;
                }
            }

            let token = AccessToken::new(
                candidate,
                payment_tx_id,
                paid_amount,
                total_credits,
                Utc::now(),
            );
            match bounded("credits.insert", self.timeout, self.store.insert_unique(&token)).await? {
                InsertOutcome::Inserted => {
                    info!(
                        token = %token.id.redacted(),
                        payment_tx_id,
                        total_credits,
                        "issued access token"
                    );
                    return Ok(token);
                }
                InsertOutcome::IdTaken => {
                    warn!(attempt, "access token id taken at insert, retrying");
                }
                InsertOutcome::PaymentClaimed => {
                    return Err(NotaryError::Conflict {
                        tx_id: payment_tx_id.to_string(),
                    });
                }
            }
        }

        // Every attempt ended on a store failure: report the outage, not exhaustion
        if lookup_failures == self.policy.max_id_attempts {
            if let Some(e) = last_lookup_error {
                return Err(e);
            }
        }

        tracing::error!(
            attempts = self.policy.max_id_attempts,
            payment_tx_id,
            "exhausted access token id attempts"
        );
        Err(NotaryError::IdSpaceExhausted {
            attempts: self.policy.max_id_attempts,
        })
    }

    /// [`Self::issue`], then notify `recipient` if one is given.
    ///
    /// A failed notification is logged and does not fail issuance.
    pub async fn issue_with_notice(
        &self,
        payment_tx_id: &str,
        paid_amount: Amount,
        recipient: Option<&str>,
    ) -> Result<AccessToken> {
        let token = self.issue(payment_tx_id, paid_amount).await?;
        if let Some(recipient) = recipient.filter(|r| !r.trim().is_empty()) {
            let notice = Notification::credential_issued(&token);
            if let Err(e) = self.notifier.send(recipient, &notice).await {
                warn!(
                    token = %token.id.redacted(),
                    notifier = self.notifier.name(),
                    error = %e,
                    "failed to send issuance notice"
                );
            }
        }
        Ok(token)
    }

    /// Atomically debit `n` credits and return the remaining balance.
    ///
    /// `n = 0` validates the credential without debiting.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed credential (no store call is made)
    /// - `NotFound`, `Disabled` or `InsufficientBalance` when the debit is refused
    /// - `Dependency` if the store fails or times out
    pub async fn consume(&self, token: &str, n: u64) -> Result<u64> {
        let id = TokenId::parse(token)?;
        self.consume_id(&id, n).await
    }

    /// [`Self::consume`] for an already validated id.
    pub async fn consume_id(&self, id: &TokenId, n: u64) -> Result<u64> {
        let debited = bounded(
            "credits.try_debit",
            self.timeout,
            self.store.try_debit(id, n, Utc::now()),
        )
        .await?;

        match debited {
            Some(remaining) => {
                debug!(token = %id.redacted(), n, remaining, "debited credits");
                Ok(remaining)
            }
            None => Err(self.explain_refusal(id, n).await),
        }
    }

    /// Validate a credential without debiting; returns the balance.
    pub async fn probe(&self, token: &str) -> Result<u64> {
        self.consume(token, 0).await
    }

    /// Read-only status. Advisory: not atomic with a later debit.
    pub async fn status(&self, token: &str) -> Result<TokenStatus> {
        let id = TokenId::parse(token)?;
        let record = self.load(&id).await?;
        Ok(TokenStatus::from(&record))
    }

    /// Soft-disable a credential. Idempotent.
    pub async fn disable(&self, token: &str) -> Result<()> {
        let id = TokenId::parse(token)?;
        let found = bounded(
            "credits.set_inactive",
            self.timeout,
            self.store.set_inactive(&id),
        )
        .await?;
        if !found {
            return Err(NotaryError::not_found(RESOURCE_ACCESS_TOKEN, id.redacted()));
        }
        info!(token = %id.redacted(), "disabled access token");
        Ok(())
    }

    /// Compensating re-credit after a failed downstream step.
    ///
    /// Capped at the token's total; returns the new balance.
    pub async fn refund(&self, id: &TokenId, n: u64) -> Result<u64> {
        bounded("credits.refund", self.timeout, self.store.refund(id, n))
            .await?
            .ok_or_else(|| NotaryError::not_found(RESOURCE_ACCESS_TOKEN, id.redacted()))
    }

    async fn load(&self, id: &TokenId) -> Result<AccessToken> {
        bounded("credits.get", self.timeout, self.store.get(id))
            .await?
            .ok_or_else(|| NotaryError::not_found(RESOURCE_ACCESS_TOKEN, id.redacted()))
    }

    /// Turn a refused conditional debit into a precise error.
    ///
    /// The record may have changed since the debit; the answer is
    /// diagnostic only.
    async fn explain_refusal(&self, id: &TokenId, n: u64) -> NotaryError {
        match self.load(id).await {
            Ok(record) if !record.active => NotaryError::Disabled {
                token: id.redacted(),
            },
            Ok(record) => NotaryError::InsufficientBalance {
                required: n,
                remaining: record.remaining_credits,
            },
            Err(e) => e,
        }
    }
}

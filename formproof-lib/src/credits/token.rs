//! Access token identifiers and records.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Amount, NotaryError, Result};

/// Fixed prefix of every credential.
pub const TOKEN_PREFIX: &str = "ak_";

/// Number of random alphanumeric characters after the prefix.
pub const TOKEN_BODY_LEN: usize = 16;

/// Access token identifier: `ak_` followed by 16 ASCII alphanumerics.
///
/// The id is also the bearer secret, so `Debug` only shows a redacted
/// prefix. Use [`TokenId::as_str`] or `Display` when the full value is
/// actually needed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(String);

impl TokenId {
    /// Validate a credential string.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the string does not match the
    /// credential pattern. No storage is consulted.
    pub fn parse(raw: &str) -> Result<Self> {
        let body = raw.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
            NotaryError::validation("access token", format!("must start with '{}'", TOKEN_PREFIX))
        })?;
        if body.len() != TOKEN_BODY_LEN || !body.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(NotaryError::validation(
                "access token",
                format!(
                    "expected '{}' followed by {} alphanumeric characters",
                    TOKEN_PREFIX, TOKEN_BODY_LEN
                ),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Generate a fresh candidate id from the operating system CSPRNG.
    pub fn generate() -> Self {
        let body: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_BODY_LEN)
            .map(char::from)
            .collect();
        Self(format!("{}{}", TOKEN_PREFIX, body))
    }

    /// Full credential string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix-only form safe for logs.
    pub fn redacted(&self) -> String {
        let visible = TOKEN_PREFIX.len() + 4;
        format!("{}…", &self.0[..visible.min(self.0.len())])
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenId").field(&self.redacted()).finish()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TokenId {
    type Err = NotaryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TokenId {
    type Error = NotaryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TokenId> for String {
    fn from(id: TokenId) -> Self {
        id.0
    }
}

/// Credit-ledger record for one credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Credential id (bearer secret).
    pub id: TokenId,
    /// Payment transaction that minted this credential.
    pub payment_tx_id: String,
    /// Amount paid to the platform.
    pub paid_amount: Amount,
    /// Credits granted at issuance.
    pub total_credits: u64,
    /// Credits left; never exceeds `total_credits`.
    pub remaining_credits: u64,
    /// Soft-disable flag.
    pub active: bool,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Time of the last successful debit.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// New active record with a full balance.
    pub fn new(
        id: TokenId,
        payment_tx_id: impl Into<String>,
        paid_amount: Amount,
        total_credits: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payment_tx_id: payment_tx_id.into(),
            paid_amount,
            total_credits,
            remaining_credits: total_credits,
            active: true,
            created_at,
            last_used_at: None,
        }
    }

    /// Whether a debit of `n` credits would currently succeed.
    pub fn can_debit(&self, n: u64) -> bool {
        self.active && self.remaining_credits >= n
    }

    /// Conditional decrement used by every store.
    ///
    /// Debits and stamps `last_used_at` only when the credential is active
    /// and holds at least `n` credits. A zero-credit probe never stamps.
    pub fn apply_debit(&mut self, n: u64, now: DateTime<Utc>) -> Option<u64> {
        if !self.can_debit(n) {
            return None;
        }
        if n > 0 {
            self.remaining_credits -= n;
            self.last_used_at = Some(now);
        }
        Some(self.remaining_credits)
    }

    /// Give back `n` credits, capped at the issued total.
    pub fn apply_refund(&mut self, n: u64) -> u64 {
        self.remaining_credits = self
            .remaining_credits
            .saturating_add(n)
            .min(self.total_credits);
        self.remaining_credits
    }

    /// Whether every credit has been spent.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_credits == 0
    }
}

/// Read-only view returned by status queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    /// Credits granted at issuance.
    pub total_credits: u64,
    /// Credits left.
    pub remaining_credits: u64,
    /// Whether the credential may still be debited.
    pub active: bool,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Time of the last successful debit.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&AccessToken> for TokenStatus {
    fn from(token: &AccessToken) -> Self {
        Self {
            total_credits: token.total_credits,
            remaining_credits: token.remaining_credits,
            active: token.active,
            created_at: token.created_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_distinct() {
        let a = TokenId::generate();
        let b = TokenId::generate();
        assert!(TokenId::parse(a.as_str()).is_ok());
        assert_eq!(a.as_str().len(), TOKEN_PREFIX.len() + TOKEN_BODY_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_rejects_bad_formats() {
        for bad in [
            "not-a-valid-id",
            "ak_",
            "ak_short",
            "ak_0123456789abcdefg",
            "AK_0123456789abcdef",
            "ak_0123456789abcde!",
            "ak_0123456789abcdé",
        ] {
            assert!(TokenId::parse(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(TokenId::parse("ak_0123456789abcdef").is_ok());
    }

    #[test]
    fn test_debug_is_redacted() {
        let id = TokenId::parse("ak_Secret123456789").unwrap();
        let debug = format!("{:?}", id);
        assert!(debug.contains("ak_Secr"));
        assert!(!debug.contains("123456789"));
        assert_eq!(id.to_string(), "ak_Secret123456789");
    }

    #[test]
    fn test_serde_validates() {
        let ok: TokenId = serde_json::from_str("\"ak_0123456789abcdef\"").unwrap();
        assert_eq!(ok.as_str(), "ak_0123456789abcdef");
        assert!(serde_json::from_str::<TokenId>("\"nope\"").is_err());
    }

    #[test]
    fn test_debit_and_refund() {
        let now = Utc::now();
        let mut token = AccessToken::new(TokenId::generate(), "tx", Amount::from_units(3), 3, now);

        assert_eq!(token.apply_debit(0, now), Some(3));
        assert_eq!(token.last_used_at, None);

        assert_eq!(token.apply_debit(2, now), Some(1));
        assert_eq!(token.last_used_at, Some(now));
        assert_eq!(token.apply_debit(2, now), None);
        assert_eq!(token.remaining_credits, 1);

        assert_eq!(token.apply_refund(10), 3);

        token.active = false;
        assert_eq!(token.apply_debit(1, now), None);
        assert_eq!(token.apply_debit(0, now), None);
    }
}

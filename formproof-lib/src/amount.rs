//! Fixed-point payment amounts.
//!
//! Ledger outputs are reported in integer base units (satoshis, lovelace,
//! ...). They are converted to an exact [`Decimal`] once, at the payment
//! verification boundary, and every later comparison or credit computation
//! stays in decimal arithmetic. Never use f64 for paid amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::NotaryError;

/// Paid amount in whole ledger units with fixed-point precision.
///
/// Serializes as a string so no precision is lost on the wire.
///
/// # Examples
///
/// ```rust
/// use formproof_lib::Amount;
///
/// // 1 234 500 000 base units at 8 decimals
/// let paid = Amount::from_base_units(1_234_500_000, 8).unwrap();
/// assert_eq!(paid.to_string(), "12.345");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    /// Wrap a decimal value.
    pub fn new(value: Decimal) -> Self {
        Self {
            value: value.normalize(),
        }
    }

    /// Build from an integer number of whole units.
    pub fn from_units(units: u64) -> Self {
        Self::new(Decimal::from(units))
    }

    /// Build from integer base units with `decimals` fractional digits.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `decimals` exceeds the 28 digits a
    /// [`Decimal`] can represent.
    pub fn from_base_units(base_units: u64, decimals: u32) -> crate::Result<Self> {
        Decimal::try_from_i128_with_scale(i128::from(base_units), decimals)
            .map(Self::new)
            .map_err(|e| NotaryError::validation("decimals", e.to_string()))
    }

    /// Parse from a decimal string (e.g., "12.5").
    ///
    /// # Errors
    ///
    /// Returns a validation error for unparsable or negative input.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| NotaryError::validation("amount", format!("'{}': {}", s, e)))?;
        if value.is_sign_negative() {
            return Err(NotaryError::validation("amount", "must not be negative"));
        }
        Ok(Self::new(value))
    }

    /// Zero amount.
    pub fn zero() -> Self {
        Self {
            value: Decimal::ZERO,
        }
    }

    /// Check if amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Get the internal Decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Checked addition (returns None on overflow).
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.value.checked_add(other.value).map(Self::new)
    }

    /// Number of whole credits this amount buys at `rate` credits per unit.
    ///
    /// Always rounds down; returns 0 on overflow or a non-positive rate so
    /// the caller rejects the issuance instead of minting a bogus balance.
    ///
    /// ```rust
    /// use formproof_lib::Amount;
    /// use rust_decimal::Decimal;
    ///
    /// let paid = Amount::parse("10.9").unwrap();
    /// assert_eq!(paid.credits_at_rate(Decimal::ONE), 10);
    /// ```
    pub fn credits_at_rate(&self, rate: Decimal) -> u64 {
        if rate <= Decimal::ZERO {
            return 0;
        }
        self.value
            .checked_mul(rate)
            .map(|credits| credits.floor())
            .and_then(|credits| credits.to_u64())
            .unwrap_or(0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for Amount {
    type Err = NotaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

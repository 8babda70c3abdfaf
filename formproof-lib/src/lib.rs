//! FormProof library.
//!
//! Token-gated notarization of form responses: clients fingerprint their
//! response data, pay the platform on-chain, receive a prepaid credential
//! and spend one credit per notarized fingerprint. Anyone can later
//! recompute a fingerprint and check it against the stored record.
//!
//! # Components
//!
//! - [`canonical`]: order-independent serialization and SHA-256 fingerprints
//!   reproducible by independent clients (RFC 8785 based)
//! - [`tabular`]: turns spreadsheet exports into the structured shape so
//!   both hash identically
//! - [`payment`]: confirms payments through a ledger query service
//! - [`credits`]: issues credentials and debits them atomically
//! - [`records`]: stores and looks up notarization records
//! - [`service`]: the issue / store / status / verify workflows
//!
//! External collaborators (persistence, ledger queries, notifications,
//! anchoring) sit behind traits and are injected by the caller.
//!
//! # Example
//!
//! ```
//! use formproof_lib::canonical::fingerprint_value;
//! use serde_json::json;
//!
//! let a = fingerprint_value(&json!({"b": 1, "a": 2})).unwrap();
//! let b = fingerprint_value(&json!({"a": 2, "b": 1})).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.as_str().len(), 64);
//! ```

use std::future::Future;
use std::time::Duration;

pub mod amount;
pub mod canonical;
pub mod config;
pub mod credits;
pub mod errors;
#[cfg(feature = "file-storage")]
mod file_lock;
pub mod notify;
pub mod payment;
pub mod persistence;
pub mod prelude;
pub mod records;
pub mod service;
pub mod tabular;

/// Test doubles and fixtures.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use amount::Amount;
pub use canonical::Fingerprint;
pub use config::NotaryConfig;
pub use credits::{AccessToken, CreditLedger, TokenId, TokenStatus};
pub use errors::{DependencyError, ErrorClass, NotaryError, NotaryErrorCode};
pub use payment::{PaymentError, PaymentVerifier};
pub use service::NotaryService;

/// Common result alias for FormProof operations.
pub type Result<T> = std::result::Result<T, NotaryError>;

/// Run `fut` with a time budget; exceeding it is a retryable dependency
/// timeout.
///
/// Dropping the future on timeout is safe for every store operation: each
/// one is a single atomic step that either happened or did not.
pub async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "operation timed out");
            Err(DependencyError::Timeout {
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }
            .into())
        }
    }
}

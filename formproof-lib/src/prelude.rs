//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use formproof_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Error types: `NotaryError`, `ErrorClass`, `Result`
//! - Fingerprinting: `Fingerprint`, `canonicalize`, `fingerprint_value`, `fingerprint_text`
//! - Tabular input: `TabularNormalizer`, `ExclusionPolicy`, `StandardizedBatch`
//! - Ledger and storage traits: `LedgerQuery`, `CreditStore`, `RecordStore`, `Notifier`
//! - Workflows: `CreditLedger`, `PaymentVerifier`, `NotaryService`

// Error handling
pub use crate::errors::{DependencyError, ErrorClass, NotaryError, NotaryErrorCode};
pub use crate::Result;

// Fingerprinting
pub use crate::canonical::{
    canonicalize, fingerprint, fingerprint_text, fingerprint_value, CanonicalInput, Fingerprint,
};
pub use crate::tabular::{ExclusionPolicy, StandardizedBatch, TabularNormalizer};

// Payments and credits
pub use crate::amount::Amount;
pub use crate::credits::{AccessToken, CreditLedger, CreditPolicy, CreditStore, TokenId, TokenStatus};
pub use crate::payment::{LedgerQuery, PaymentError, PaymentVerifier, VerifiedPayment};

// Collaborators
pub use crate::notify::Notifier;
pub use crate::records::{NotarizationRecord, RecordStore};

// Workflows
pub use crate::config::NotaryConfig;
pub use crate::service::{AnchorSubmitter, NotaryService};

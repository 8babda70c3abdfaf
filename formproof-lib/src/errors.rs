//! Error types for FormProof operations.
//!
//! Every failure surfaced by the library falls into one of the classes the
//! notarization pipeline distinguishes for its callers: validation,
//! not-found, conflict, insufficient balance, disabled, dependency
//! (retryable) and internal. [`NotaryError::class`] exposes that classification together
//! with an HTTP-equivalent status code so transports can map errors
//! without matching on every variant.

use thiserror::Error;

/// Error codes for FFI and transport integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum NotaryErrorCode {
    /// Feature not compiled in or not implemented
    Unimplemented = 1000,
    /// Malformed identifier, amount or fingerprint
    Validation = 2000,
    /// Input could not be canonicalized
    Canonicalization = 2001,
    /// Serialization error
    Serialization = 2002,
    /// Credential, fingerprint or transaction not found
    NotFound = 3000,
    /// Payment already claimed by another credential
    Conflict = 4000,
    /// Credential has no remaining credits for the request
    InsufficientBalance = 5000,
    /// Credential has been disabled
    Disabled = 5001,
    /// External collaborator timed out
    DependencyTimeout = 6000,
    /// External collaborator rate-limited the request
    DependencyRateLimited = 6001,
    /// External collaborator unreachable or failing
    DependencyUnavailable = 6002,
    /// Candidate id generation exhausted its attempts
    IdSpaceExhausted = 9000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Coarse error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request was wrong; never retried by the server.
    Validation,
    /// Unknown credential, unknown fingerprint or not-yet-visible transaction.
    NotFound,
    /// The payment already backs another credential.
    Conflict,
    /// Credits exhausted; buying more credits resolves it.
    InsufficientBalance,
    /// Credential disabled by an operator; more credits do not help.
    Disabled,
    /// A collaborator failed; retry with backoff.
    Dependency,
    /// Anything unexpected.
    Internal,
}

impl ErrorClass {
    /// HTTP-equivalent status code for this class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::InsufficientBalance => 402,
            Self::Disabled => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
            Self::Dependency => 503,
        }
    }
}

/// Failure of an external collaborator (ledger query service, persistence).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// The call did not complete within its time budget.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// The collaborator asked us to slow down.
    #[error("{service} rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Collaborator name
        service: String,
        /// Suggested retry delay in milliseconds
        retry_after_ms: u64,
    },

    /// The collaborator is unreachable or returned a server error.
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        /// Collaborator name
        service: String,
        /// Underlying error message
        reason: String,
    },
}

/// Comprehensive error type for FormProof operations.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// Feature not compiled in.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    /// Malformed input (identifier, amount, fingerprint, configuration).
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Input could not be brought into canonical form (caller error).
    #[error("cannot canonicalize input: {0}")]
    Canonicalization(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("{resource_type} not found: {identifier}")]
    NotFound {
        /// Type of resource (e.g., "access token", "fingerprint", "transaction")
        resource_type: String,
        /// Resource identifier
        identifier: String,
    },

    /// Payment transaction already claimed by a credential.
    #[error("payment {tx_id} already claimed by another credential")]
    Conflict {
        /// Payment transaction id
        tx_id: String,
    },

    /// Not enough remaining credits.
    #[error("insufficient credits: need {required}, have {remaining}")]
    InsufficientBalance {
        /// Credits requested
        required: u64,
        /// Credits left on the credential
        remaining: u64,
    },

    /// Credential disabled by an administrator.
    #[error("access token {token} is disabled")]
    Disabled {
        /// Redacted credential
        token: String,
    },

    /// External collaborator failure; retryable.
    #[error("dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Id generation hit a collision on every attempt.
    #[error("could not allocate a unique access token after {attempts} attempts")]
    IdSpaceExhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NotaryError {
    /// Get the error code for FFI/transport integration.
    pub fn code(&self) -> NotaryErrorCode {
        match self {
            Self::Unimplemented(_) => NotaryErrorCode::Unimplemented,
            Self::Validation { .. } => NotaryErrorCode::Validation,
            Self::Canonicalization(_) => NotaryErrorCode::Canonicalization,
            Self::Serialization(_) => NotaryErrorCode::Serialization,
            Self::NotFound { .. } => NotaryErrorCode::NotFound,
            Self::Conflict { .. } => NotaryErrorCode::Conflict,
            Self::InsufficientBalance { .. } => NotaryErrorCode::InsufficientBalance,
            Self::Disabled { .. } => NotaryErrorCode::Disabled,
            Self::Dependency(DependencyError::Timeout { .. }) => NotaryErrorCode::DependencyTimeout,
            Self::Dependency(DependencyError::RateLimited { .. }) => {
                NotaryErrorCode::DependencyRateLimited
            }
            Self::Dependency(DependencyError::Unavailable { .. }) => {
                NotaryErrorCode::DependencyUnavailable
            }
            Self::IdSpaceExhausted { .. } => NotaryErrorCode::IdSpaceExhausted,
            Self::Internal(_) => NotaryErrorCode::Internal,
        }
    }

    /// Classify the error for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } | Self::Canonicalization(_) | Self::Serialization(_) => {
                ErrorClass::Validation
            }
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Conflict { .. } => ErrorClass::Conflict,
            Self::InsufficientBalance { .. } => ErrorClass::InsufficientBalance,
            Self::Disabled { .. } => ErrorClass::Disabled,
            Self::Dependency(_) => ErrorClass::Dependency,
            Self::Unimplemented(_) | Self::IdSpaceExhausted { .. } | Self::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Returns true if this error is potentially recoverable by retrying.
    ///
    /// A transaction that is not yet visible on the ledger is retryable:
    /// the payment may simply not have propagated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Dependency(_) => true,
            Self::NotFound { resource_type, .. } => resource_type == RESOURCE_TRANSACTION,
            _ => false,
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Dependency(DependencyError::RateLimited { retry_after_ms, .. }) => {
                Some(*retry_after_ms)
            }
            Self::Dependency(DependencyError::Timeout { .. }) => Some(1000),
            Self::Dependency(DependencyError::Unavailable { .. }) => Some(2000),
            Self::NotFound { resource_type, .. } if resource_type == RESOURCE_TRANSACTION => {
                Some(30_000)
            }
            _ => None,
        }
    }

    /// Create a not found error.
    pub fn not_found(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a dependency-unavailable error.
    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dependency(DependencyError::Unavailable {
            service: service.into(),
            reason: reason.into(),
        })
    }
}

/// Resource type used for ledger transactions that are not (yet) visible.
pub const RESOURCE_TRANSACTION: &str = "transaction";

/// Resource type used for unknown credentials.
pub const RESOURCE_ACCESS_TOKEN: &str = "access token";

/// Resource type used for unknown fingerprints.
pub const RESOURCE_FINGERPRINT: &str = "fingerprint";

impl From<serde_json::Error> for NotaryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = NotaryError::Dependency(DependencyError::RateLimited {
            service: "esplora".into(),
            retry_after_ms: 5000,
        });
        assert_eq!(err.code(), NotaryErrorCode::DependencyRateLimited);
        assert_eq!(err.class(), ErrorClass::Dependency);
        assert!(err.is_retryable());
        assert_eq!(err.retry_after_ms(), Some(5000));
    }

    #[test]
    fn test_pending_transaction_is_retryable() {
        let pending = NotaryError::not_found(RESOURCE_TRANSACTION, "ab12");
        assert!(pending.is_retryable());
        assert_eq!(pending.class(), ErrorClass::NotFound);

        let unknown_token = NotaryError::not_found(RESOURCE_ACCESS_TOKEN, "ak_...");
        assert!(!unknown_token.is_retryable());
        assert_eq!(unknown_token.retry_after_ms(), None);
    }

    #[test]
    fn test_balance_and_disabled_are_distinct_classes() {
        let balance = NotaryError::InsufficientBalance {
            required: 1,
            remaining: 0,
        };
        let disabled = NotaryError::Disabled {
            token: "ak_abcd…".into(),
        };
        assert_ne!(balance.class(), disabled.class());
        assert_ne!(balance.code(), disabled.code());
        assert_eq!(balance.class().status_code(), 402);
        assert_eq!(disabled.class(), ErrorClass::Disabled);
        assert_eq!(disabled.class().status_code(), 403);
        assert!(!disabled.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = NotaryError::validation("txid", "expected 64 hex characters");
        assert_eq!(err.to_string(), "invalid txid: expected 64 hex characters");

        let err = NotaryError::IdSpaceExhausted { attempts: 5 };
        assert!(err.to_string().contains("5 attempts"));
        assert_eq!(err.class(), ErrorClass::Internal);
    }
}

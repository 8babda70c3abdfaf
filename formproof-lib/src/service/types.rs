//! Transport-agnostic request and response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credits::TokenStatus;
use crate::{Amount, ErrorClass, NotaryError, Result};

/// Credential issuance request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    /// Payment transaction id.
    pub tx_id: String,
    /// Where to send the issuance notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
}

/// Credential issuance response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    /// The new credential.
    pub access_token: String,
    /// Credits granted.
    pub total_credits: u64,
    /// Amount paid to the platform.
    pub paid_amount: Amount,
    /// Confirmation depth of the payment, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

/// Fingerprint storage request; the credential travels separately as a
/// bearer header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    /// Fingerprint to notarize.
    pub fingerprint: String,
    /// Opaque descriptor (source identifiers, capture time).
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Anchoring transaction already submitted by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_tx_id: Option<String>,
}

/// Fingerprint storage response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    /// Anchoring transaction id.
    pub tx_id: String,
    /// Credits left after the debit.
    pub remaining_credits: u64,
    /// Explorer URL for the anchoring transaction.
    pub proof_url: String,
    /// Id of the stored record.
    pub record_id: String,
}

/// Credential presented on a status request.
///
/// Callers may put the credential in a header, a query parameter or the
/// body. When several are present the header wins, then the body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedCredential {
    /// Raw `Authorization` header value.
    #[serde(default)]
    pub authorization: Option<String>,
    /// Credential from a `token` query parameter.
    #[serde(default)]
    pub query: Option<String>,
    /// Credential from the request body.
    #[serde(default)]
    pub body: Option<String>,
}

impl PresentedCredential {
    /// Credential from an `Authorization` header.
    pub fn header(value: impl Into<String>) -> Self {
        Self {
            authorization: Some(value.into()),
            ..Self::default()
        }
    }

    /// Credential from a query parameter.
    pub fn query(value: impl Into<String>) -> Self {
        Self {
            query: Some(value.into()),
            ..Self::default()
        }
    }

    /// Credential from a request body.
    pub fn body(value: impl Into<String>) -> Self {
        Self {
            body: Some(value.into()),
            ..Self::default()
        }
    }

    /// Pick the credential string to validate.
    pub fn resolve(&self) -> Result<&str> {
        if let Some(header) = self.authorization.as_deref() {
            return parse_bearer(header);
        }
        self.body
            .as_deref()
            .or(self.query.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NotaryError::validation("access token", "no credential presented"))
    }
}

/// Status response.
pub type StatusResponse = TokenStatus;

/// Verification request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Fingerprint to look up.
    pub fingerprint: String,
}

/// Verification response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether a matching record exists.
    pub verified: bool,
    /// Descriptor of the earliest matching record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// When the earliest matching record was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<DateTime<Utc>>,
    /// Explorer URL of its anchoring transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
}

/// Error body returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Error class.
    pub error: ErrorClass,
    /// HTTP-equivalent status code.
    pub status: u16,
    /// Stable numeric code.
    pub code: i32,
    /// Precise reason.
    pub message: String,
    /// Whether retrying may succeed.
    pub retryable: bool,
    /// Suggested delay before retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl From<&NotaryError> for ErrorBody {
    fn from(err: &NotaryError) -> Self {
        let class = err.class();
        Self {
            error: class,
            status: class.status_code(),
            code: err.code() as i32,
            message: err.to_string(),
            retryable: err.is_retryable(),
            retry_after_ms: err.retry_after_ms(),
        }
    }
}

/// Extract the credential from an `Authorization: Bearer <id>` value.
///
/// The scheme is case-insensitive. The credential itself is not validated
/// here.
pub fn parse_bearer(header: &str) -> Result<&str> {
    let header = header.trim();
    let (scheme, credential) = header
        .split_once(char::is_whitespace)
        .ok_or_else(|| NotaryError::validation("authorization", "expected 'Bearer <token>'"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(NotaryError::validation(
            "authorization",
            format!("unsupported scheme '{}'", scheme),
        ));
    }
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(NotaryError::validation("authorization", "empty credential"));
    }
    Ok(credential)
}

//! The token-gated notarization workflows.
//!
//! [`NotaryService`] wires the payment verifier, the credit ledger and the
//! record store into the four external operations: issue, store, status
//! and verify. It is transport-agnostic; an HTTP front end maps headers,
//! query parameters and bodies onto the request types in [`types`] and
//! renders failures with [`ErrorBody`].
//!
//! # Debit without record
//!
//! Storing a fingerprint debits a credit first, then anchors and writes the
//! record. If either later step fails the credit is refunded (a
//! compensating re-credit). If the refund fails too, the inconsistency is
//! logged at error level with `reconciliation = "manual"` so an operator
//! can repair it.

mod anchor;
pub mod types;

pub use anchor::AnchorSubmitter;
pub use types::{
    parse_bearer, ErrorBody, IssueRequest, IssueResponse, PresentedCredential, StatusResponse,
    StoreRequest, StoreResponse, VerifyRequest, VerifyResponse,
};

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument, warn};

use crate::canonical::Fingerprint;
use crate::config::NotaryConfig;
use crate::credits::{CreditLedger, TokenId};
use crate::notify::build_notifier;
use crate::payment::{normalize_tx_id, LedgerQuery, PaymentVerifier};
use crate::persistence::Persistence;
use crate::records::{NotarizationRecord, RecordStore};
use crate::{bounded, NotaryError, Result};

/// Credits debited per stored fingerprint.
pub const CREDITS_PER_STORE: u64 = 1;

/// Notarization workflows over the ledger, verifier and record store.
pub struct NotaryService {
    verifier: PaymentVerifier,
    ledger: CreditLedger,
    records: Arc<dyn RecordStore>,
    anchor: Option<Arc<dyn AnchorSubmitter>>,
    persistence_timeout: Duration,
    ledger_timeout: Duration,
}

impl NotaryService {
    /// Assemble a service from its parts.
    pub fn new(verifier: PaymentVerifier, ledger: CreditLedger, records: Arc<dyn RecordStore>) -> Self {
        Self {
            verifier,
            ledger,
            records,
            anchor: None,
            persistence_timeout: crate::credits::DEFAULT_PERSISTENCE_TIMEOUT,
            ledger_timeout: Duration::from_millis(15_000),
        }
    }

    /// Build the service described by `config` over `persistence`.
    pub fn from_config(
        config: &NotaryConfig,
        persistence: &Persistence,
        ledger_query: Arc<dyn LedgerQuery>,
    ) -> Result<Self> {
        config.validate()?;
        let notifier = build_notifier(&config.notifier, config.timeouts.ledger())?;
        let verifier = PaymentVerifier::new(
            ledger_query,
            config.payment.clone(),
            config.credits.minimum_payment,
            config.timeouts.ledger(),
        );
        let ledger = CreditLedger::new(persistence.credits(), config.credits.clone())
            .with_notifier(notifier)
            .with_timeout(config.timeouts.persistence());
        Ok(Self::new(verifier, ledger, persistence.records())
            .with_timeouts(config.timeouts.persistence(), config.timeouts.ledger()))
    }

    /// Use `submitter` when a store request carries no anchoring transaction.
    pub fn with_anchor_submitter(mut self, submitter: Arc<dyn AnchorSubmitter>) -> Self {
        self.anchor = Some(submitter);
        self
    }

    /// Set the persistence and anchoring budgets.
    pub fn with_timeouts(mut self, persistence: Duration, ledger: Duration) -> Self {
        self.persistence_timeout = persistence;
        self.ledger_timeout = ledger;
        self
    }

    /// The credit ledger.
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Verify a payment and mint a credential for it.
    #[instrument(skip(self, request), fields(tx_id = %request.tx_id))]
    pub async fn issue(&self, request: &IssueRequest) -> Result<IssueResponse> {
        let payment = self.verifier.verify(&request.tx_id).await?;
        let token = self
            .ledger
            .issue_with_notice(&payment.tx_id, payment.paid_amount, request.notify.as_deref())
            .await?;
        Ok(IssueResponse {
            access_token: token.id.to_string(),
            total_credits: token.total_credits,
            paid_amount: token.paid_amount,
            confirmations: payment.confirmations,
        })
    }

    /// Debit one credit and notarize a fingerprint.
    ///
    /// Everything that can be validated locally (credential format,
    /// fingerprint, anchoring transaction id) is checked before the debit.
    #[instrument(skip(self, authorization, request), fields(fingerprint = %request.fingerprint))]
    pub async fn store(&self, authorization: &str, request: &StoreRequest) -> Result<StoreResponse> {
        let token = TokenId::parse(parse_bearer(authorization)?)?;
        let fingerprint = Fingerprint::parse(&request.fingerprint)?;
        let client_anchor = request
            .anchor_tx_id
            .as_deref()
            .map(|tx| normalize_tx_id(tx, self.verifier.config().txid_length))
            .transpose()?;
        if client_anchor.is_none() && self.anchor.is_none() {
            return Err(NotaryError::validation(
                "anchorTxId",
                "required: no anchoring service is configured",
            ));
        }

        let remaining = self.ledger.consume_id(&token, CREDITS_PER_STORE).await?;

        match self
            .anchor_and_record(client_anchor, &fingerprint, &request.metadata)
            .await
        {
            Ok((tx_id, record_id)) => Ok(StoreResponse {
                proof_url: self.verifier.config().proof_url(&tx_id),
                tx_id,
                remaining_credits: remaining,
                record_id,
            }),
            Err(e) => {
                self.compensate(&token, &fingerprint, &e).await;
                Err(e)
            }
        }
    }

    /// Report a credential's balance. Credential may come from a header,
    /// query parameter or body.
    #[instrument(skip_all)]
    pub async fn status(&self, credential: &PresentedCredential) -> Result<StatusResponse> {
        self.ledger.status(credential.resolve()?).await
    }

    /// Check whether a fingerprint has been notarized. Free; no credential.
    #[instrument(skip(self, request), fields(fingerprint = %request.fingerprint))]
    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse> {
        let fingerprint = Fingerprint::parse(&request.fingerprint)?;
        let found = bounded(
            "records.get",
            self.persistence_timeout,
            self.records.get(&fingerprint),
        )
        .await?;
        Ok(match found {
            Some(record) => VerifyResponse {
                verified: true,
                proof_url: record
                    .anchor_tx_id
                    .as_deref()
                    .map(|tx| self.verifier.config().proof_url(tx)),
                metadata: Some(record.metadata),
                stored_at: Some(record.stored_at),
            },
            None => VerifyResponse {
                verified: false,
                metadata: None,
                stored_at: None,
                proof_url: None,
            },
        })
    }

    async fn anchor_and_record(
        &self,
        client_anchor: Option<String>,
        fingerprint: &Fingerprint,
        metadata: &serde_json::Value,
    ) -> Result<(String, String)> {
        let tx_id = match (client_anchor, self.anchor.as_ref()) {
            (Some(tx_id), _) => tx_id,
            (None, Some(submitter)) => {
                bounded(
                    "anchor.submit",
                    self.ledger_timeout,
                    submitter.submit(fingerprint, metadata),
                )
                .await?
            }
            (None, None) => {
                return Err(NotaryError::Internal(
                    "no anchoring transaction available".to_string(),
                ))
            }
        };

        let record = NotarizationRecord::new(fingerprint.clone(), metadata.clone(), Some(tx_id.clone()));
        let record_id = bounded("records.put", self.persistence_timeout, self.records.put(record)).await?;
        Ok((tx_id, record_id))
    }

    async fn compensate(&self, token: &TokenId, fingerprint: &Fingerprint, cause: &NotaryError) {
        match self.ledger.refund(token, CREDITS_PER_STORE).await {
            Ok(balance) => warn!(
                token = %token.redacted(),
                %fingerprint,
                error = %cause,
                balance,
                "storage failed after debit; credit refunded"
            ),
            Err(refund_error) => error!(
                token = %token.redacted(),
                %fingerprint,
                credits = CREDITS_PER_STORE,
                error = %cause,
                refund_error = %refund_error,
                reconciliation = "manual",
                "credit debited without a stored record"
            ),
        }
    }
}

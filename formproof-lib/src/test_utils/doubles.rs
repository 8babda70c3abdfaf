//! Store, notifier and anchoring doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::canonical::Fingerprint;
use crate::credits::{AccessToken, CreditStore, InsertOutcome, TokenId};
use crate::notify::{Notification, Notifier};
use crate::records::{NotarizationRecord, RecordStore};
use crate::service::AnchorSubmitter;
use crate::{NotaryError, Result};

/// Wraps a credit store and counts every call made to it.
///
/// Refunds and id checks can be made to fail on demand.
pub struct CountingCreditStore<S> {
    inner: S,
    calls: AtomicUsize,
    fail_refunds: AtomicBool,
    fail_id_checks: AtomicBool,
}

impl<S: CreditStore> CountingCreditStore<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fail_refunds: AtomicBool::new(false),
            fail_id_checks: AtomicBool::new(false),
        }
    }

    /// Make every later refund fail as an unavailable dependency.
    pub fn fail_refunds(&self) {
        self.fail_refunds.store(true, Ordering::SeqCst);
    }

    /// Make every later id availability check fail.
    pub fn fail_id_checks(&self) {
        self.fail_id_checks.store(true, Ordering::SeqCst);
    }

    /// Calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: CreditStore> CreditStore for CountingCreditStore<S> {
    async fn insert_unique(&self, token: &AccessToken) -> Result<InsertOutcome> {
        self.tick();
        self.inner.insert_unique(token).await
    }

    async fn id_exists(&self, id: &TokenId) -> Result<bool> {
        self.tick();
        if self.fail_id_checks.load(Ordering::SeqCst) {
            return Err(NotaryError::unavailable("credit store", "injected lookup failure"));
        }
        self.inner.id_exists(id).await
    }

    async fn find_by_payment(&self, payment_tx_id: &str) -> Result<Option<AccessToken>> {
        self.tick();
        self.inner.find_by_payment(payment_tx_id).await
    }

    async fn get(&self, id: &TokenId) -> Result<Option<AccessToken>> {
        self.tick();
        self.inner.get(id).await
    }

    async fn try_debit(&self, id: &TokenId, n: u64, now: DateTime<Utc>) -> Result<Option<u64>> {
        self.tick();
        self.inner.try_debit(id, n, now).await
    }

    async fn refund(&self, id: &TokenId, n: u64) -> Result<Option<u64>> {
        self.tick();
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(NotaryError::unavailable("credit store", "injected refund failure"));
        }
        self.inner.refund(id, n).await
    }

    async fn set_inactive(&self, id: &TokenId) -> Result<bool> {
        self.tick();
        self.inner.set_inactive(id).await
    }
}

/// Record store whose every operation fails as an unavailable dependency.
pub struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn put(&self, _record: NotarizationRecord) -> Result<String> {
        Err(NotaryError::unavailable("record store", "injected failure"))
    }

    async fn get(&self, _fingerprint: &Fingerprint) -> Result<Option<NotarizationRecord>> {
        Err(NotaryError::unavailable("record store", "injected failure"))
    }

    async fn find_all(&self, _fingerprint: &Fingerprint) -> Result<Vec<NotarizationRecord>> {
        Err(NotaryError::unavailable("record store", "injected failure"))
    }
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that rejects every delivery.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Delivered `(recipient, payload)` pairs.
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, recipient: &str, payload: &Notification) -> Result<()> {
        if self.fail {
            return Err(NotaryError::unavailable("notifier", "injected failure"));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((recipient.to_string(), payload.clone()));
        Ok(())
    }
}

/// Anchoring double that always returns the same transaction id, or
/// always fails.
pub struct StaticAnchor {
    tx_id: String,
    submitted: AtomicUsize,
    fail: bool,
}

impl StaticAnchor {
    /// Anchor returning `tx_id`.
    pub fn new(tx_id: impl Into<String>) -> Self {
        Self {
            tx_id: tx_id.into(),
            submitted: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Anchor whose every submission fails as an unavailable dependency.
    pub fn failing() -> Self {
        Self {
            tx_id: String::new(),
            submitted: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of submissions.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnchorSubmitter for StaticAnchor {
    async fn submit(
        &self,
        _fingerprint: &Fingerprint,
        _metadata: &serde_json::Value,
    ) -> Result<String> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotaryError::unavailable("anchor", "injected failure"));
        }
        Ok(self.tx_id.clone())
    }
}

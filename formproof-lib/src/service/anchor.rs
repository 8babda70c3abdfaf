//! Anchoring collaborator.
//!
//! Building and signing the anchoring transaction belongs to a wallet. The
//! service only needs something that turns `(fingerprint, metadata)` into a
//! transaction id on the ledger.

use async_trait::async_trait;

use crate::canonical::Fingerprint;
use crate::Result;

/// Submits an anchoring transaction carrying a fingerprint.
#[async_trait]
pub trait AnchorSubmitter: Send + Sync {
    /// Anchor `fingerprint` and return the transaction id.
    async fn submit(&self, fingerprint: &Fingerprint, metadata: &serde_json::Value)
        -> Result<String>;
}

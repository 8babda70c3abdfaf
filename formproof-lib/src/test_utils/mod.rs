//! Test utilities for FormProof.
//!
//! This module provides:
//! - A scriptable in-memory ledger query service
//! - Store and notifier doubles that count calls or fail on demand
//! - Fixtures for payments and form captures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use formproof_lib::test_utils::{payment_txid, MockLedger, PLATFORM_ADDRESS};
//!
//! let chain = MockLedger::new().with_tip(100);
//! let tx = payment_txid(1);
//! chain.add_payment(&tx, 1_000_000_000, Some(95)); // 10 units, 6 confirmations
//! ```

mod doubles;
mod fixtures;
mod mock_ledger;

pub use doubles::{CountingCreditStore, FailingRecordStore, RecordingNotifier, StaticAnchor};
pub use fixtures::{
    payment_txid, sample_capture, sample_export, test_config, PLATFORM_ADDRESS, UNITS,
};
pub use mock_ledger::MockLedger;

//! Test fixtures and data generators.

use crate::config::NotaryConfig;
use crate::payment::PaymentConfig;
use crate::tabular::{CapturedResponse, ResponseItem};

/// Receiving address used by every fixture.
pub const PLATFORM_ADDRESS: &str = "tb1qformproofplatform0000000000000000000";

/// Base units per whole unit at the default 8 decimals.
pub const UNITS: u64 = 100_000_000;

/// Deterministic, well-formed 64-hex transaction id.
pub fn payment_txid(n: u64) -> String {
    format!("{:064x}", n)
}

/// Configuration for [`PLATFORM_ADDRESS`] with in-memory storage.
pub fn test_config() -> NotaryConfig {
    NotaryConfig {
        payment: PaymentConfig::new(PLATFORM_ADDRESS)
            .with_explorer_tx_url("https://explorer.test/tx/{txid}"),
        ..NotaryConfig::default()
    }
}

/// Two captured responses in form order (no timestamp field).
pub fn sample_capture() -> Vec<CapturedResponse> {
    let response = |name: &str, rating: &str, comment: &str| CapturedResponse {
        items: vec![
            ResponseItem {
                title: "Name".to_string(),
                response: name.to_string(),
            },
            ResponseItem {
                title: "Rating".to_string(),
                response: rating.to_string(),
            },
            ResponseItem {
                title: "Comments".to_string(),
                response: comment.to_string(),
            },
        ],
    };
    vec![
        response("Ada", "5", "Great workshop"),
        response("Grace", "4", ""),
    ]
}

/// The spreadsheet export of [`sample_capture`]: extra timestamp column,
/// different column order, padded headers.
pub fn sample_export() -> Vec<Vec<String>> {
    [
        ["Timestamp", " Rating ", "Comments", "Name"],
        ["2024-05-01 09:12:44", "5", "Great workshop", "Ada"],
        ["2024-05-01 09:15:02", "4", "", "Grace"],
    ]
    .iter()
    .map(|row| row.iter().map(|c| c.to_string()).collect())
    .collect()
}

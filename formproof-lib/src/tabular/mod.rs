//! Tabular export normalization.
//!
//! A spreadsheet export of form responses and the structured capture taken
//! directly from the form must hash identically. Both are brought into the
//! same [`StandardizedBatch`] shape here:
//!
//! - headers are trimmed,
//! - timestamp-like columns are dropped (the export always carries a
//!   generation timestamp that the structured capture never fingerprints),
//! - remaining fields are ordered alphabetically by title,
//! - every response receives a position-based id (`response_1`, ...).
//!
//! Which columns count as timestamp-like is an [`ExclusionPolicy`]. The
//! default is the substring heuristic the form add-on uses; an explicit
//! list can replace it when a legitimate field name contains "date" or
//! "time". Every normalization reports the headers it dropped so a
//! mismatch between the two paths can be diagnosed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::canonical::{self, Fingerprint};
use crate::{NotaryError, Result};

/// Substrings that mark a header as timestamp-like under the heuristic policy.
pub const DEFAULT_TIMESTAMP_MARKERS: [&str; 3] = ["timestamp", "time", "date"];

/// One answered question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItem {
    /// Question title (trimmed header).
    pub title: String,
    /// Answer text.
    pub response: String,
}

/// One form submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedResponse {
    /// Position-based id, `response_<n>` starting at 1.
    pub response_id: String,
    /// Answers ordered by title.
    pub items: Vec<ResponseItem>,
}

/// Canonicalizer input shared by tabular exports and structured captures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedBatch {
    /// Number of responses in the batch.
    pub response_count: usize,
    /// The responses.
    pub responses: Vec<StandardizedResponse>,
}

impl StandardizedBatch {
    /// Fingerprint this batch with the canonicalizer.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        canonical::fingerprint_serializable(self)
    }
}

/// Result of a normalization, with the diagnostics needed to explain a
/// fingerprint mismatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalized {
    /// The batch to fingerprint.
    pub batch: StandardizedBatch,
    /// Trimmed titles that the exclusion policy dropped.
    pub excluded_fields: Vec<String>,
}

/// Rule deciding which fields are excluded from fingerprinting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "fields", rename_all = "lowercase")]
pub enum ExclusionPolicy {
    /// Drop fields whose title contains any marker, case-insensitively.
    Heuristic(Vec<String>),
    /// Drop exactly these titles, compared case-insensitively after trimming.
    Explicit(Vec<String>),
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::Heuristic(
            DEFAULT_TIMESTAMP_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        )
    }
}

impl ExclusionPolicy {
    /// Explicit policy from a list of titles.
    pub fn explicit<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Explicit(fields.into_iter().map(Into::into).collect())
    }

    /// Check whether a (trimmed) title is excluded.
    pub fn excludes(&self, title: &str) -> bool {
        let title = title.trim().to_lowercase();
        match self {
            Self::Heuristic(markers) => markers
                .iter()
                .any(|marker| title.contains(&marker.to_lowercase())),
            Self::Explicit(fields) => fields
                .iter()
                .any(|field| field.trim().to_lowercase() == title),
        }
    }
}

/// A response captured directly from the form, before normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedResponse {
    /// Answers in form order.
    pub items: Vec<ResponseItem>,
}

/// Converts tabular exports and structured captures into [`StandardizedBatch`].
#[derive(Clone, Debug, Default)]
pub struct TabularNormalizer {
    policy: ExclusionPolicy,
}

impl TabularNormalizer {
    /// Create a normalizer with the given exclusion policy.
    pub fn new(policy: ExclusionPolicy) -> Self {
        Self { policy }
    }

    /// The active exclusion policy.
    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    /// Normalize a table whose first row holds the headers.
    ///
    /// Rows where every cell is empty are skipped; short rows are padded
    /// with empty answers and cells beyond the header row are ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty table or duplicate headers
    /// among the kept columns.
    pub fn normalize(&self, rows: &[Vec<String>]) -> Result<Normalized> {
        let (header_row, data_rows) = rows
            .split_first()
            .ok_or_else(|| NotaryError::validation("rows", "table has no header row"))?;

        let headers: Vec<String> = header_row.iter().map(|h| h.trim().to_string()).collect();

        let mut excluded_fields = Vec::new();
        let mut kept: Vec<(usize, &str)> = Vec::new();
        for (index, title) in headers.iter().enumerate() {
            if self.policy.excludes(title) {
                excluded_fields.push(title.clone());
            } else {
                kept.push((index, title.as_str()));
            }
        }
        kept.sort_by(|(_, a), (_, b)| a.cmp(b));
        if let Some(pair) = kept.windows(2).find(|pair| pair[0].1 == pair[1].1) {
            return Err(NotaryError::validation(
                "rows",
                format!("duplicate column header '{}'", pair[0].1),
            ));
        }

        let responses: Vec<StandardizedResponse> = data_rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .enumerate()
            .map(|(position, row)| StandardizedResponse {
                response_id: response_id(position),
                items: kept
                    .iter()
                    .map(|(index, title)| ResponseItem {
                        title: (*title).to_string(),
                        response: row.get(*index).cloned().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        debug!(
            responses = responses.len(),
            excluded = excluded_fields.len(),
            "normalized tabular export"
        );

        Ok(Normalized {
            batch: StandardizedBatch {
                response_count: responses.len(),
                responses,
            },
            excluded_fields,
        })
    }

    /// Normalize a structured capture with the same rules as [`Self::normalize`].
    ///
    /// The kept titles seen across the capture play the role of the header
    /// row: responses where every answer is empty are skipped and responses
    /// missing a title get an empty answer for it, so positional ids line
    /// up with the export of the same form.
    ///
    /// # Errors
    ///
    /// Returns a validation error if one response repeats a kept title.
    pub fn normalize_capture(&self, captured: &[CapturedResponse]) -> Result<Normalized> {
        let mut excluded_fields: Vec<String> = Vec::new();
        let mut titles: BTreeSet<String> = BTreeSet::new();
        let mut answered: Vec<BTreeMap<String, String>> = Vec::new();

        for (index, capture) in captured.iter().enumerate() {
            if capture.items.iter().all(|item| item.response.trim().is_empty()) {
                continue;
            }
            let mut answers = BTreeMap::new();
            for item in &capture.items {
                let title = item.title.trim().to_string();
                if self.policy.excludes(&title) {
                    if !excluded_fields.contains(&title) {
                        excluded_fields.push(title);
                    }
                    continue;
                }
                if answers.contains_key(&title) {
                    return Err(NotaryError::validation(
                        "responses",
                        format!("response {} repeats the title '{}'", index + 1, title),
                    ));
                }
                titles.insert(title.clone());
                answers.insert(title, item.response.clone());
            }
            answered.push(answers);
        }

        let responses: Vec<StandardizedResponse> = answered
            .into_iter()
            .enumerate()
            .map(|(position, mut answers)| StandardizedResponse {
                response_id: response_id(position),
                items: titles
                    .iter()
                    .map(|title| ResponseItem {
                        title: title.clone(),
                        response: answers.remove(title).unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        debug!(
            responses = responses.len(),
            excluded = excluded_fields.len(),
            "normalized structured capture"
        );

        Ok(Normalized {
            batch: StandardizedBatch {
                response_count: responses.len(),
                responses,
            },
            excluded_fields,
        })
    }
}

fn response_id(position: usize) -> String {
    format!("response_{}", position + 1)
}

/// Convert a JSON table (array of arrays of scalars) into string rows.
///
/// Numbers and booleans are rendered with their JSON text, `null` becomes
/// an empty cell.
///
/// # Errors
///
/// Returns a validation error if the value is not an array of arrays of
/// scalars.
pub fn rows_from_json(value: &Value) -> Result<Vec<Vec<String>>> {
    let rows = value
        .as_array()
        .ok_or_else(|| NotaryError::validation("rows", "expected an array of rows"))?;
    rows.iter()
        .enumerate()
        .map(|(r, row)| {
            let cells = row.as_array().ok_or_else(|| {
                NotaryError::validation("rows", format!("row {} is not an array", r))
            })?;
            cells
                .iter()
                .map(|cell| match cell {
                    Value::String(s) => Ok(s.clone()),
                    Value::Null => Ok(String::new()),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(b) => Ok(b.to_string()),
                    _ => Err(NotaryError::validation(
                        "rows",
                        format!("row {} contains a nested value", r),
                    )),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_timestamp_columns_dropped_and_fields_sorted() {
        let rows = table(&[
            &["Timestamp", " Name ", "Age", "Favourite colour"],
            &["2024-01-01 10:00", "Ada", "36", "green"],
        ]);
        let normalized = TabularNormalizer::default().normalize(&rows).unwrap();

        assert_eq!(normalized.excluded_fields, vec!["Timestamp".to_string()]);
        let titles: Vec<&str> = normalized.batch.responses[0]
            .items
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Age", "Favourite colour", "Name"]);
        assert_eq!(normalized.batch.responses[0].response_id, "response_1");
        assert_eq!(normalized.batch.response_count, 1);
    }

    #[test]
    fn test_heuristic_matches_substrings_case_insensitively() {
        let policy = ExclusionPolicy::default();
        assert!(policy.excludes("Submission DATE"));
        assert!(policy.excludes("Start time"));
        // The known false positive: a legitimate field containing "date".
        assert!(policy.excludes("Candidate"));
        assert!(!policy.excludes("Email"));
    }

    #[test]
    fn test_explicit_policy_keeps_lookalike_fields() {
        let policy = ExclusionPolicy::explicit(["Timestamp"]);
        assert!(policy.excludes(" timestamp "));
        assert!(!policy.excludes("Candidate"));

        let rows = table(&[&["Timestamp", "Candidate"], &["x", "Grace"]]);
        let normalized = TabularNormalizer::new(policy).normalize(&rows).unwrap();
        assert_eq!(normalized.batch.responses[0].items[0].title, "Candidate");
    }

    #[test]
    fn test_blank_rows_skipped_short_rows_padded() {
        let rows = table(&[
            &["Name", "Answer"],
            &["", ""],
            &["Ada"],
            &["Grace", "yes", "extra"],
        ]);
        let normalized = TabularNormalizer::default().normalize(&rows).unwrap();
        let batch = normalized.batch;
        assert_eq!(batch.response_count, 2);
        assert_eq!(batch.responses[0].response_id, "response_1");
        assert_eq!(batch.responses[0].items[0].response, "");
        assert_eq!(batch.responses[1].items.len(), 2);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(TabularNormalizer::default().normalize(&[]).is_err());
    }

    #[test]
    fn test_duplicate_headers_rejected() {
        let rows = table(&[&["Name", " Name"], &["a", "b"]]);
        assert!(TabularNormalizer::default().normalize(&rows).is_err());
    }

    #[test]
    fn test_capture_and_export_hash_identically() {
        let capture = vec![
            CapturedResponse {
                items: vec![
                    ResponseItem {
                        title: "Name".into(),
                        response: "Ada".into(),
                    },
                    ResponseItem {
                        title: "Answer".into(),
                        response: "yes".into(),
                    },
                ],
            },
            CapturedResponse {
                items: vec![
                    ResponseItem {
                        title: "Name".into(),
                        response: "Grace".into(),
                    },
                    ResponseItem {
                        title: "Answer".into(),
                        response: "no".into(),
                    },
                ],
            },
        ];
        let export = table(&[
            &["Timestamp", "Name", "Answer"],
            &["2024-03-01 09:00:00", "Ada", "yes"],
            &["2024-03-01 09:05:00", "Grace", "no"],
        ]);

        let normalizer = TabularNormalizer::default();
        let from_capture = normalizer.normalize_capture(&capture).unwrap().batch;
        let from_export = normalizer.normalize(&export).unwrap().batch;

        assert_eq!(from_capture, from_export);
        assert_eq!(
            from_capture.fingerprint().unwrap(),
            from_export.fingerprint().unwrap()
        );
    }

    fn captured(items: &[(&str, &str)]) -> CapturedResponse {
        CapturedResponse {
            items: items
                .iter()
                .map(|(title, response)| ResponseItem {
                    title: title.to_string(),
                    response: response.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_capture_blank_and_short_responses_match_export() {
        let capture = vec![
            captured(&[("Name", ""), ("Answer", " ")]),
            captured(&[("Name", "Ada")]),
            captured(&[("Answer", "yes"), (" Name ", "Grace")]),
        ];
        let export = table(&[
            &["Name", "Answer"],
            &["", ""],
            &["Ada"],
            &["Grace", "yes"],
        ]);

        let normalizer = TabularNormalizer::default();
        let from_capture = normalizer.normalize_capture(&capture).unwrap().batch;
        let from_export = normalizer.normalize(&export).unwrap().batch;

        assert_eq!(from_capture.response_count, 2);
        assert_eq!(from_capture.responses[0].response_id, "response_1");
        assert_eq!(from_capture.responses[0].items.len(), 2);
        assert_eq!(from_capture.responses[0].items[0].title, "Answer");
        assert_eq!(from_capture.responses[0].items[0].response, "");
        assert_eq!(from_capture, from_export);
    }

    #[test]
    fn test_capture_duplicate_titles_rejected() {
        let capture = vec![captured(&[("Name", "a"), (" Name", "b")])];
        let err = TabularNormalizer::default()
            .normalize_capture(&capture)
            .unwrap_err();
        assert!(matches!(err, NotaryError::Validation { .. }));

        // Excluded titles may repeat; they never reach the batch
        let capture = vec![captured(&[("Timestamp", "1"), ("Timestamp", "2"), ("Name", "a")])];
        let normalized = TabularNormalizer::default()
            .normalize_capture(&capture)
            .unwrap();
        assert_eq!(normalized.excluded_fields, vec!["Timestamp".to_string()]);
    }

    #[test]
    fn test_batch_serializes_camel_case() {
        let rows = table(&[&["Q"], &["a"]]);
        let batch = TabularNormalizer::default().normalize(&rows).unwrap().batch;
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            value,
            json!({
                "responseCount": 1,
                "responses": [{"responseId": "response_1", "items": [{"title": "Q", "response": "a"}]}]
            })
        );
    }

    #[test]
    fn test_rows_from_json() {
        let rows = rows_from_json(&json!([["Name", "Score"], ["Ada", 10], [null, true]])).unwrap();
        assert_eq!(rows[1], vec!["Ada".to_string(), "10".to_string()]);
        assert_eq!(rows[2], vec![String::new(), "true".to_string()]);

        assert!(rows_from_json(&json!({"not": "a table"})).is_err());
        assert!(rows_from_json(&json!([["a", ["nested"]]])).is_err());
    }
}

//! Normalize command - turn exports and captures into the standard batch

use anyhow::{Context as _, Result};
use formproof_lib::tabular::{
    rows_from_json, CapturedResponse, ExclusionPolicy, Normalized, TabularNormalizer,
};
use serde_json::Value;
use std::path::Path;

use super::Context;
use crate::ui;

pub async fn run(
    ctx: &Context,
    input: &Path,
    exclude: Vec<String>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;

    let policy = if exclude.is_empty() {
        ctx.config.tabular.clone()
    } else {
        ExclusionPolicy::explicit(exclude)
    };
    let normalized = normalize_value(&TabularNormalizer::new(policy), &value)?;
    let fingerprint = normalized.batch.fingerprint()?;

    if let Some(path) = output {
        let pretty = serde_json::to_string_pretty(&normalized.batch)?;
        std::fs::write(path, pretty)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if json {
        ui::json(&serde_json::json!({
            "fingerprint": fingerprint,
            "excludedFields": normalized.excluded_fields,
            "batch": normalized.batch,
        }));
        return Ok(());
    }

    ui::header("Normalized Responses");
    ui::key_value("Responses", &normalized.batch.response_count.to_string());
    if normalized.excluded_fields.is_empty() {
        ui::key_value("Excluded", "none");
    } else {
        ui::key_value("Excluded", &normalized.excluded_fields.join(", "));
    }
    ui::key_value("Fingerprint", fingerprint.as_str());
    if let Some(path) = output {
        ui::success(&format!("Batch written to {}", path.display()));
    }

    if ctx.verbose {
        ui::separator();
        ui::json(&serde_json::to_value(&normalized.batch)?);
    }

    Ok(())
}

/// Rows (array of arrays) go through the tabular path; anything else must
/// be a structured capture.
fn normalize_value(normalizer: &TabularNormalizer, value: &Value) -> Result<Normalized> {
    let is_table = value
        .as_array()
        .and_then(|rows| rows.first())
        .map(Value::is_array)
        .unwrap_or(false);

    if is_table {
        let rows = rows_from_json(value)?;
        return Ok(normalizer.normalize(&rows)?);
    }

    let captured: Vec<CapturedResponse> = serde_json::from_value(value.clone())
        .context("Expected an array of rows or an array of {\"items\": [...]} responses")?;
    Ok(normalizer.normalize_capture(&captured)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_and_capture_agree() {
        let normalizer = TabularNormalizer::default();
        let table = json!([
            ["Timestamp", "Q1", "Q2"],
            ["2024-01-01", "yes", "no"]
        ]);
        let capture = json!([
            {"items": [{"title": "Q2", "response": "no"}, {"title": "Q1", "response": "yes"}]}
        ]);

        let a = normalize_value(&normalizer, &table).unwrap();
        let b = normalize_value(&normalizer, &capture).unwrap();
        assert_eq!(a.batch, b.batch);
        assert_eq!(a.excluded_fields, vec!["Timestamp".to_string()]);
    }

    #[test]
    fn test_rejects_unknown_shape() {
        let normalizer = TabularNormalizer::default();
        assert!(normalize_value(&normalizer, &json!({"rows": []})).is_err());
    }
}

//! Notarization commands - store a fingerprint, verify one

use anyhow::{anyhow, bail, Context as _, Result};
use formproof_lib::service::{StoreRequest, VerifyRequest};
use serde_json::Value;
use std::path::Path;

use super::fingerprint::fingerprint_file;
use super::{explain, Context};
use crate::ui;

pub async fn store(
    ctx: &Context,
    token: &str,
    fingerprint: &str,
    anchor_tx: Option<String>,
    metadata: Option<&str>,
) -> Result<()> {
    let metadata = match metadata {
        Some(raw) => serde_json::from_str(raw).context("--metadata must be valid JSON")?,
        None => Value::Object(Default::default()),
    };

    let service = ctx.service()?;
    let stored = service
        .store(
            &format!("Bearer {}", token),
            &StoreRequest {
                fingerprint: fingerprint.to_string(),
                metadata,
                anchor_tx_id: anchor_tx,
            },
        )
        .await
        .map_err(explain)?;

    ui::success("Fingerprint notarized");
    ui::key_value("Record", &stored.record_id);
    ui::key_value("Anchor", &stored.tx_id);
    ui::key_value("Proof", &stored.proof_url);
    ui::key_value("Remaining credits", &stored.remaining_credits.to_string());
    Ok(())
}

pub async fn verify(ctx: &Context, fingerprint: Option<&str>, file: Option<&Path>) -> Result<()> {
    let fingerprint = match (fingerprint, file) {
        (_, Some(path)) => fingerprint_file(path)?.to_string(),
        (Some(fp), None) => fp.to_string(),
        (None, None) => return Err(anyhow!("Provide a fingerprint or --file")),
    };

    let service = ctx.service()?;
    let response = service
        .verify(&VerifyRequest {
            fingerprint: fingerprint.clone(),
        })
        .await
        .map_err(explain)?;

    if !response.verified {
        ui::error(&format!("No notarization record for {}", fingerprint));
        bail!("fingerprint not notarized");
    }

    ui::success("Fingerprint verified");
    ui::key_value("Fingerprint", &fingerprint);
    if let Some(stored_at) = response.stored_at {
        ui::key_value("Stored", &stored_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }
    if let Some(url) = &response.proof_url {
        ui::key_value("Proof", url);
    }
    if let Some(metadata) = response.metadata.as_ref().filter(|m| !is_empty(m)) {
        println!("  Metadata:");
        ui::json(metadata);
    }
    Ok(())
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

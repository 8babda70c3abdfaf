//! Fingerprint command - hash a file the way every FormProof client does

use anyhow::{Context, Result};
use formproof_lib::canonical::{self, CanonicalInput, Fingerprint};
use std::io::Read;
use std::path::Path;

use crate::ui;

pub async fn run(input: &str, force_text: bool, json: bool, verbose: bool) -> Result<()> {
    let raw = read_input(input)?;
    let parsed = if force_text {
        CanonicalInput::Text(raw)
    } else {
        CanonicalInput::detect(&raw)
    };
    let kind = match &parsed {
        CanonicalInput::Structured(_) => "structured",
        CanonicalInput::Text(_) => "text",
    };
    let fingerprint = canonical::fingerprint(&parsed)?;

    if json {
        ui::json(&serde_json::json!({
            "fingerprint": fingerprint,
            "input": kind,
        }));
        return Ok(());
    }

    ui::header("Fingerprint");
    ui::key_value("Input", kind);
    ui::key_value("SHA-256", fingerprint.as_str());

    if verbose {
        if let CanonicalInput::Structured(value) = &parsed {
            ui::separator();
            println!("{}", canonical::canonicalize(value)?);
        }
    }

    Ok(())
}

/// Read a file, or stdin when `input` is `-`.
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(Path::new(input)).with_context(|| format!("Failed to read {}", input))
}

/// Fingerprint a file with automatic input detection.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(canonical::fingerprint(&CanonicalInput::detect(&raw))?)
}

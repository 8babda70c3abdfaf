//! Smoke tests for formproof-cli
//!
//! These tests run the binary against a temporary data directory and an
//! empty configuration file. None of them need network access.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the CLI with an isolated config and data directory
fn run_cli(home: &Path, args: &[&str]) -> Output {
    let config = home.join("config.toml");
    if !config.exists() {
        std::fs::write(&config, "").expect("Failed to write config");
    }

    let mut full = vec!["run", "-q", "-p", "formproof-cli", "--"];
    full.extend_from_slice(args);

    let output = Command::new("cargo")
        .args(&full)
        .env("FORMPROOF_CONFIG", &config)
        .env("FORMPROOF_DATA_DIR", home.join("data"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("Failed to execute command");

    if !output.status.success() {
        eprintln!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }
    output
}

/// Test that the CLI can show help
#[test]
fn test_cli_help() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let output = run_cli(home.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for command in ["fingerprint", "normalize", "issue", "status", "store", "verify"] {
        assert!(stdout.contains(command), "Help should mention '{}'", command);
    }
}

/// Test that version is shown
#[test]
fn test_cli_version() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let output = run_cli(home.path(), &["--version"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("formproof"));
}

/// Key order must not change the fingerprint of a JSON document
#[test]
fn test_fingerprint_json_file() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let input = home.path().join("data.json");
    std::fs::write(&input, r#"{"b": 1, "a": 2}"#).unwrap();

    let output = run_cli(
        home.path(),
        &["fingerprint", input.to_str().unwrap(), "--json"],
    );

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // sha256 of {"a":2,"b":1}
    assert_eq!(
        parsed["fingerprint"],
        "d3626ac30a87e6f7a6428233b3c68299976865fa5508e4267c5415c76af7a772"
    );
    assert_eq!(parsed["input"], "structured");
}

/// Plain text is hashed byte for byte
#[test]
fn test_fingerprint_text_file() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let input = home.path().join("note.txt");
    std::fs::write(&input, "hello form").unwrap();

    let output = run_cli(
        home.path(),
        &["fingerprint", input.to_str().unwrap(), "--text", "--json"],
    );

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        parsed["fingerprint"],
        "d5c7cfab73aebde959cce28c69719ee937f4fc93ec67a4c630d0cdfb3b4de8a5"
    );
    assert_eq!(parsed["input"], "text");
}

/// Normalizing an export reports the dropped timestamp column
#[test]
fn test_normalize_export() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let input = home.path().join("export.json");
    std::fs::write(
        &input,
        r#"[["Timestamp", "Name", "Rating"], ["2024-05-01 09:12:44", "Ada", "5"]]"#,
    )
    .unwrap();
    let batch = home.path().join("batch.json");

    let output = run_cli(
        home.path(),
        &[
            "normalize",
            input.to_str().unwrap(),
            "--output",
            batch.to_str().unwrap(),
            "--json",
        ],
    );

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["excludedFields"], serde_json::json!(["Timestamp"]));
    assert_eq!(parsed["batch"]["responseCount"], 1);

    // The written batch fingerprints to the reported value
    let again = run_cli(
        home.path(),
        &["fingerprint", batch.to_str().unwrap(), "--json"],
    );
    let again: serde_json::Value = serde_json::from_slice(&again.stdout).unwrap();
    assert_eq!(again["fingerprint"], parsed["fingerprint"]);
}

/// Malformed tokens are rejected before anything is looked up
#[test]
fn test_status_rejects_malformed_token() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let output = run_cli(home.path(), &["status", "not-a-token"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid"), "stderr: {}", stderr);
}

/// Unknown tokens are reported as not found
#[test]
fn test_consume_unknown_token() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let output = run_cli(home.path(), &["consume", "ak_AAAAAAAAAAAAAAAA"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

/// Verifying an unknown fingerprint fails without credentials
#[test]
fn test_verify_unknown_fingerprint() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let unknown = "0".repeat(64);
    let output = run_cli(home.path(), &["verify", unknown.as_str()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No notarization record"), "stderr: {}", stderr);
}

/// Issuing without a receiving address fails before any lookup
#[test]
fn test_issue_requires_receiving_address() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let tx_id = "ab".repeat(32);
    let output = run_cli(home.path(), &["issue", tx_id.as_str()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("receiving_address"), "stderr: {}", stderr);
}

/// The effective configuration is printed as TOML
#[test]
fn test_config_show() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let output = run_cli(home.path(), &["config", "show"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[credits]"));
    assert!(stdout.contains("backend = \"file\""));
}

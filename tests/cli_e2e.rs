//! End-to-end CLI tests for wcdump.
//!
//! These tests run the actual wcdump binary against synthetic backups and
//! verify:
//! - Command-line interface behavior
//! - Output format and content
//! - Exit codes and error messages
//!
//! # Test Organization
//!
//! Tests are organized by command:
//! - `test_dump_*` - Dump command tests
//! - `test_list_*` - List command tests
//! - `test_export_*` - Export command tests
//! - `test_cli_*` - General CLI tests (flags, help, version)

mod common;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use common::{ALICE, SyntheticBackup};
use predicates::prelude::*;
use std::fs;
use std::time::Instant;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

/// Log a test event with timestamp
macro_rules! test_log {
    ($($arg:tt)*) => {
        let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f");
        eprintln!("[TEST {}] {}", timestamp, format!($($arg)*));
    };
}

/// Get the wcdump command ready for testing, isolated from user config.
fn wcdump_cmd(config_dir: &TempDir) -> Command {
    let config = config_dir.path().join("config.toml");
    if !config.exists() {
        fs::write(&config, "[window]\ntimezone = \"UTC\"\n").expect("write config");
    }
    let mut cmd = cargo_bin_cmd!("wcdump");
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("WCDUMP_TZ")
        .env_remove("WCDUMP_OUTPUT")
        .env_remove("WCDUMP_OUTGOING_FLAG")
        .env_remove("WCDUMP_BINARY_BODIES")
        .env_remove("WCDUMP_PARALLEL")
        .env_remove("WCDUMP_LOG_FORMAT")
        .arg("--config")
        .arg(config);
    cmd
}

// =============================================================================
// General CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    test_log!("Starting test_cli_help");
    let start = Instant::now();
    let config = TempDir::new().unwrap();

    wcdump_cmd(&config)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("wcdump"))
        .stdout(predicate::str::contains("Usage"));

    test_log!("test_cli_help completed in {:?}", start.elapsed());
}

#[test]
fn test_cli_version() {
    let config = TempDir::new().unwrap();
    wcdump_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wcdump"));
}

#[test]
fn test_cli_completions() {
    let config = TempDir::new().unwrap();
    wcdump_cmd(&config)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wcdump"));
}

#[test]
fn test_cli_broken_config_is_usage_error() {
    let config = TempDir::new().unwrap();
    fs::write(
        config.path().join("config.toml"),
        "[decode]\noutgoing_flag = \"one\"\n",
    )
    .unwrap();

    wcdump_cmd(&config)
        .args(["list", "/nonexistent"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"));
}

// =============================================================================
// Dump Command Tests
// =============================================================================

#[test]
fn test_dump_writes_json_file() {
    test_log!("Starting test_dump_writes_json_file");
    let start = Instant::now();
    let config = TempDir::new().unwrap();
    let backup = SyntheticBackup::standard();
    let out = TempDir::new().unwrap();
    let output = out.path().join("dump.json");

    wcdump_cmd(&config)
        .arg("dump")
        .arg(backup.root())
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("3 conversations"))
        .stderr(predicate::str::contains("30 messages"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let conversations = json.as_array().unwrap();
    assert_eq!(conversations.len(), 3);
    for conv in conversations {
        assert_eq!(conv["message_count"], 10);
        assert_eq!(conv["messages"].as_array().unwrap().len(), 10);
    }

    test_log!("test_dump_writes_json_file completed in {:?}", start.elapsed());
}

#[test]
fn test_dump_to_stdout() {
    let config = TempDir::new().unwrap();
    let backup = SyntheticBackup::standard();

    let output = wcdump_cmd(&config)
        .arg("dump")
        .arg(backup.root())
        .args(["-o", "-", "--compact"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let alice = json
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["usrname"] == ALICE)
        .unwrap();
    assert_eq!(alice["nickname"], "Alice");
    assert_eq!(alice["chat_type"], "direct");
    assert_eq!(alice["messages"][0]["direction"], "outgoing");
}

#[test]
fn test_dump_absolute_window() {
    let config = TempDir::new().unwrap();
    let backup = SyntheticBackup::standard();

    // All synthetic messages are on 2023-11-14 (UTC).
    let output = wcdump_cmd(&config)
        .arg("dump")
        .arg(backup.root())
        .args(["-o", "-", "--from-date", "2023-11-15"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json, serde_json::json!([]));

    let output = wcdump_cmd(&config)
        .arg("dump")
        .arg(backup.root())
        .args(["-o", "-", "--from-date", "2023-11-14", "--to-date", "2023-11-14"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[test]
fn test_dump_conflicting_window_fails_before_reading() {
    test_log!("Starting test_dump_conflicting_window_fails_before_reading");
    let config = TempDir::new().unwrap();

    // The root does not exist: a storage error would exit 1, not 2.
    wcdump_cmd(&config)
        .args([
            "dump",
            "/definitely/not/a/backup",
            "--last-days",
            "7",
            "--from-date",
            "2025-01-01",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Conflicting time window options"));
}

#[test]
fn test_dump_rejects_negative_amount() {
    let config = TempDir::new().unwrap();
    wcdump_cmd(&config)
        .args(["dump", "/definitely/not/a/backup", "--last-hours", "-5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must not be negative"));
}

#[test]
fn test_dump_rejects_unknown_time_zone() {
    let config = TempDir::new().unwrap();
    wcdump_cmd(&config)
        .args([
            "dump",
            "/definitely/not/a/backup",
            "--from-date",
            "2025-01-01",
            "--tz",
            "Mars/Olympus_Mons",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown time zone"));
}

#[test]
fn test_dump_missing_backup() {
    let config = TempDir::new().unwrap();
    wcdump_cmd(&config)
        .args(["dump", "/definitely/not/a/backup"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Backup not found"));
}

// =============================================================================
// List Command Tests
// =============================================================================

#[test]
fn test_list_shows_accounts_shards_and_contacts() {
    let config = TempDir::new().unwrap();
    let backup = SyntheticBackup::standard();

    wcdump_cmd(&config)
        .arg("list")
        .arg(backup.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("acc0001"))
        .stdout(predicate::str::contains("message_1"))
        .stdout(predicate::str::contains("message_2"))
        .stdout(predicate::str::contains(ALICE))
        .stdout(predicate::str::contains("official-account"));
}

#[test]
fn test_list_empty_backup() {
    let config = TempDir::new().unwrap();
    let empty = TempDir::new().unwrap();

    wcdump_cmd(&config)
        .arg("list")
        .arg(empty.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No accounts found"));
}

// =============================================================================
// Export Command Tests
// =============================================================================

#[test]
fn test_export_writes_tree() {
    test_log!("Starting test_export_writes_tree");
    let start = Instant::now();
    let config = TempDir::new().unwrap();
    let backup = SyntheticBackup::standard();
    let out = TempDir::new().unwrap();

    wcdump_cmd(&config)
        .arg("export")
        .arg(backup.root())
        .arg("--out")
        .arg(out.path())
        .arg("--no-media")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 conversations"));

    let account_dir = out.path().join("acc0001");
    for name in ["Alice.csv", "Family.csv", "Daily News.csv"] {
        let csv = fs::read_to_string(account_dir.join(name)).unwrap();
        assert_eq!(csv.lines().count(), 11, "{name}");
    }
    assert!(!account_dir.join("media").exists());

    test_log!("test_export_writes_tree completed in {:?}", start.elapsed());
}

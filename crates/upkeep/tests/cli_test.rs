//! Integration tests for the `upkeep` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and error handling — all without requiring a live backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `upkeep` binary with env isolation.
///
/// Clears all `UPKEEP_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn upkeep_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("upkeep");
    cmd.env("HOME", "/tmp/upkeep-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/upkeep-cli-test-nonexistent")
        .env_remove("UPKEEP_PROFILE")
        .env_remove("UPKEEP_SERVER")
        .env_remove("UPKEEP_OUTPUT")
        .env_remove("UPKEEP_INSECURE")
        .env_remove("UPKEEP_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = upkeep_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    upkeep_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("maintenance")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("alerts"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    upkeep_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("upkeep"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    upkeep_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    upkeep_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = upkeep_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_devices_list_no_backend_configured() {
    upkeep_cmd()
        .args(["devices", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("server")
                .or(predicate::str::contains("backend"))
                .or(predicate::str::contains("config")),
        );
}

#[test]
fn test_connection_refused_exits_with_connection_code() {
    let output = upkeep_cmd()
        .args(["--server", "http://127.0.0.1:9", "status"])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(7),
        "Expected connection exit code:\n{}",
        combined_output(&output)
    );
}

#[test]
fn test_empty_ack_notes_is_a_usage_error() {
    let output = upkeep_cmd()
        .args(["--yes", "alerts", "ack", "a1", "--notes", "   "])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(2),
        "Expected usage exit code:\n{}",
        combined_output(&output)
    );
}

#[test]
fn test_unknown_profile_fails() {
    upkeep_cmd()
        .args(["--profile", "staging", "devices", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_config_show_no_config() {
    // `config show` uses load_config_or_default() so it succeeds even
    // when no config file exists — it just renders the default config.
    upkeep_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_invalid_output_format() {
    let output = upkeep_cmd()
        .args(["--output", "invalid", "devices", "list"])
        .output()
        .unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid output format"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid")
            || text.contains("possible values")
            || text.contains("valid value"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_global_flags_parsing() {
    // All flags should parse correctly — the failure should be about
    // missing backend config, not about argument parsing.
    upkeep_cmd()
        .args([
            "--output",
            "json",
            "--verbose",
            "--insecure",
            "--timeout",
            "60",
            "devices",
            "list",
        ])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("server")
                .or(predicate::str::contains("backend"))
                .or(predicate::str::contains("config")),
        );
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_devices_subcommands_exist() {
    upkeep_cmd()
        .args(["devices", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list").and(predicate::str::contains("get")));
}

#[test]
fn test_alerts_subcommands_exist() {
    upkeep_cmd()
        .args(["alerts", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("ack"))
                .and(predicate::str::contains("stats"))
                .and(predicate::str::contains("trend")),
        );
}

#[test]
fn test_alerts_list_filter_flags_exist() {
    upkeep_cmd()
        .args(["alerts", "list", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--tab")
                .and(predicate::str::contains("--severity"))
                .and(predicate::str::contains("--search"))
                .and(predicate::str::contains("--page-size")),
        );
}

#[test]
fn test_settings_subcommands_exist() {
    upkeep_cmd()
        .args(["settings", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("show")
                .and(predicate::str::contains("set-threshold"))
                .and(predicate::str::contains("notifications")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    upkeep_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("list-profiles")),
        );
}

//! Integration tests for the `tagwatch` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling run
//! offline; the account-bound commands run against a wiremock API.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `tagwatch` binary with env isolation.
///
/// Clears all `TAGWATCH_*` env vars and points every config and data
/// directory at `home` so tests never touch the user's real state.
fn tagwatch_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tagwatch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("TAGWATCH_PROFILE")
        .env_remove("TAGWATCH_CONFIG")
        .env_remove("TAGWATCH_API_URL")
        .env_remove("TAGWATCH_OUTPUT")
        .env_remove("TAGWATCH_TIMEOUT")
        .env_remove("TAGWATCH_LOG_JSON")
        .env_remove("TAGWATCH_NO_KEYRING")
        .env_remove("TAGWATCH_EMAIL")
        .env_remove("TAGWATCH_PASSWORD")
        .arg("--no-keyring");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Persist a logged-in session for the default profile, token included.
fn write_session(home: &Path) {
    let dir = home.join("data").join("tagwatch").join("sessions");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("default.toml"),
        "account_id = \"42\"\nlogged_in = true\ntoken = \"tok\"\n",
    )
    .unwrap();
}

fn state_body() -> serde_json::Value {
    json!({
        "chipolos": [
            { "mac": "AA:BB", "ble_connected": 0, "data": { "name": "Keys", "battery_low": 1, "battery_empty": 0 } }
        ],
        "devices": [ { "id": 991, "name": "Pixel", "battery_level": 64 } ]
    })
}

async fn mock_state(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v2/user/42/state"))
        .and(header("Chipolo-Token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = tagwatch_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Chipolo")
            .and(predicate::str::contains("login"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("ring"))
            .and(predicate::str::contains("run")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tagwatch"));
}

#[test]
fn test_invalid_subcommand() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .arg("explode")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_status_without_config() {
    let home = TempDir::new().unwrap();
    let output = tagwatch_cmd(home.path())
        .args(["-o", "json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["profile"], "default");
    assert_eq!(status["logged_in"], false);
    assert_eq!(status["poll_interval"], "15m");
}

#[test]
fn test_status_reports_persisted_session() {
    let home = TempDir::new().unwrap();
    write_session(home.path());
    let output = tagwatch_cmd(home.path())
        .args(["-o", "json", "status"])
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["logged_in"], true);
    assert_eq!(status["account_id"], "42");
    assert_eq!(status["has_token"], true);
}

#[test]
fn test_config_show_no_config() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success();
}

#[test]
fn test_unknown_profile_is_not_found() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .args(["--profile", "nope", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_ring_without_credentials_is_auth_error() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .args(["ring", "991"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("tagwatch login"));
}

#[test]
fn test_invalid_api_url_is_usage_error() {
    let home = TempDir::new().unwrap();
    tagwatch_cmd(home.path())
        .args(["--api-url", "ftp://example.com", "devices"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("api_url"));
}

// ── Against a mock account API ──────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_lists_tags_and_phones() {
    let server = MockServer::start().await;
    mock_state(&server, 1).await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    let mut cmd = tagwatch_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v2/", server.uri()), "-o", "plain", "devices"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "AA:BB\n991");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_once_reports_changes() {
    let server = MockServer::start().await;
    // One fetch to discover devices, one for the poll itself.
    mock_state(&server, 2).await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    let mut cmd = tagwatch_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v2/", server.uri()), "-o", "json", "run", "--once"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let events: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let summary: Vec<String> = events
        .iter()
        .map(|e| {
            format!(
                "{} {} {}",
                e["device"].as_str().unwrap(),
                e["event"].as_str().unwrap(),
                e.get("capability")
                    .or_else(|| e.get("flow"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            "AA:BB capability alarm_disconnected",
            "AA:BB flow disconnected",
            "AA:BB capability alarm_battery",
            "991 capability battery_level",
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rate_limited_devices_call_exits_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/user/42/state"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    let mut cmd = tagwatch_cmd(home.path());
    cmd.args(["--api-url", &format!("{}/v2/", server.uri()), "devices"]);
    let output = run_blocking(cmd).await;

    assert_eq!(output.status.code(), Some(9), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("throttling"));
}

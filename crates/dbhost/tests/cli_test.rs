//! Integration tests for the `dbhost` CLI binary.
//!
//! Every test gets its own config directory, so nothing touches the
//! user's real credentials.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// A `dbhost` command isolated to `config_dir`.
fn dbhost_cmd(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("dbhost");
    cmd.env("DBHOST_CONFIG_DIR", config_dir)
        .env("HOME", config_dir)
        .env("NO_COLOR", "1")
        .env_remove("DBHOST_API_URL")
        .env_remove("DBHOST_STREAM_URL")
        .env_remove("DBHOST_CA_BUNDLE")
        .env_remove("DBHOST_TIMEOUT")
        .env_remove("DBHOST_ACCOUNT")
        .env_remove("DBHOST_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn root_pem() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../dbhost-api/tests/fixtures/root.pem")
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Seed a logged-in state: credential file plus a selected account.
fn seed_login(dir: &Path, api_url: &str) {
    std::fs::write(
        dir.join("credentials"),
        json!({ "email": "a@x.com", "oauth_token": "tok1" }).to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!(
            "api_url = \"{api_url}\"\nca_bundle = \"{}\"\naccount = \"acme\"\ntimeout = 5\n",
            root_pem().display()
        ),
    )
    .unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = dbhost_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("deployments")
                .and(predicate::str::contains("backups"))
                .and(predicate::str::contains("login")),
        );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dbhost"));
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef dbhost"));
}

#[test]
fn test_invalid_subcommand() {
    let dir = TempDir::new().unwrap();
    let output = dbhost_cmd(dir.path()).arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("foobar"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_override() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.path().to_str().unwrap()));
}

#[test]
fn test_config_set_then_show() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .args(["config", "set", "timeout", "12"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("timeout = 12"), "saved config:\n{saved}");

    dbhost_cmd(dir.path())
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"timeout\": 12")
                .and(predicate::str::contains("\"logged_in_as\": null")),
        );
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .args(["config", "set", "timeout", "soon"])
        .assert()
        .code(2);
    dbhost_cmd(dir.path())
        .args(["config", "set", "stream_url", "https://api.dbhost.io/mongo"])
        .assert()
        .code(2);
    dbhost_cmd(dir.path())
        .args(["config", "set", "colour", "blue"])
        .assert()
        .code(2);
    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_does_not_persist_env_overrides() {
    let dir = TempDir::new().unwrap();
    dbhost_cmd(dir.path())
        .env("DBHOST_API_URL", "http://one-off.test")
        .args(["config", "set", "timeout", "12"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert_eq!(saved.trim(), "timeout = 12");
}

#[test]
fn test_zero_timeout_in_file_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "timeout = 0\n").unwrap();

    let output = dbhost_cmd(dir.path()).arg("regions").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("timeout"));

    // The broken value can still be repaired in place.
    dbhost_cmd(dir.path())
        .args(["config", "set", "timeout", "20"])
        .assert()
        .success();
}

// ── Trust anchor ────────────────────────────────────────────────────

#[test]
fn test_missing_ca_bundle_is_a_connection_error() {
    let dir = TempDir::new().unwrap();
    let output = dbhost_cmd(dir.path()).arg("regions").output().unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("ca-bundle.pem"));
}

// ── Logout ──────────────────────────────────────────────────────────

#[test]
fn test_logout_without_bundle_still_removes_credentials() {
    let dir = TempDir::new().unwrap();
    seed_login(dir.path(), "https://api.dbhost.io");

    dbhost_cmd(dir.path())
        .args(["logout", "--ca-bundle", "/nonexistent/ca.pem"])
        .assert()
        .success()
        .stderr(predicate::str::contains("token not revoked"));

    assert!(!dir.path().join("credentials").exists());
    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(!saved.contains("acme"), "account should be cleared:\n{saved}");
}

#[test]
fn test_logout_with_invalid_config_still_removes_credentials() {
    let dir = TempDir::new().unwrap();
    seed_login(dir.path(), "https://api.dbhost.io");
    let config = dir.path().join("config.toml");
    let seeded = std::fs::read_to_string(&config).unwrap();
    std::fs::write(&config, seeded.replace("timeout = 5", "timeout = 0")).unwrap();

    dbhost_cmd(dir.path())
        .env("DBHOST_API_URL", "http://one-off.test")
        .arg("logout")
        .assert()
        .success()
        .stderr(predicate::str::contains("token not revoked"));

    assert!(!dir.path().join("credentials").exists());
    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(!saved.contains("acme"), "account should be cleared:\n{saved}");
    assert!(!saved.contains("one-off"), "env override leaked to disk:\n{saved}");
}

// ── End to end ──────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_regions_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/regions"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-User-Agent-Deprecated", "true")
                .insert_header("X-User-Agent-Deprecation-Message", "please upgrade dbhost")
                .set_body_json(json!([
                    { "name": "aws-us-east-1", "provider": "aws", "location": "Virginia" }
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    seed_login(dir.path(), &server.uri());
    let config_dir = dir.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        dbhost_cmd(&config_dir)
            .args(["regions", "-o", "json-compact"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr:\n{stderr}");
    assert!(stdout.contains(r#""name":"aws-us-east-1""#), "stdout:\n{stdout}");
    assert!(stderr.contains("please upgrade dbhost"), "stderr:\n{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_deployment_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/deployments/acme/nope"))
        .respond_with(ResponseTemplate::new(200).set_body_string("NOT FOUND"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    seed_login(dir.path(), &server.uri());
    let config_dir = dir.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        dbhost_cmd(&config_dir)
            .args(["deployments", "info", "nope"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("deployments list"));
}

//! End-to-end CLI tests for the couch-session binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::mock_server;

/// Binary command isolated from the caller's config and password environment.
fn couch_session(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("couch-session").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("COUCH_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let temp = TempDir::new().unwrap();
    couch_session(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ession-cookie authentication"));
}

#[test]
fn test_binary_version_displays_version() {
    let temp = TempDir::new().unwrap();
    couch_session(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("couch-session"));
}

#[test]
fn test_binary_missing_url_returns_error() {
    let temp = TempDir::new().unwrap();
    couch_session(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_username_returns_error() {
    let temp = TempDir::new().unwrap();
    couch_session(&temp)
        .env("COUCH_PASSWORD", "secret")
        .arg("http://127.0.0.1:1/db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("username"));
}

#[test]
fn test_binary_missing_password_env_returns_error() {
    let temp = TempDir::new().unwrap();
    couch_session(&temp)
        .args(["-u", "alice", "http://127.0.0.1:1/db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("COUCH_PASSWORD"));
}

#[test]
fn test_binary_invalid_config_returns_error() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("bad.toml");
    std::fs::write(&config, "max_replays = 42\n").unwrap();
    couch_session(&temp)
        .env("COUCH_PASSWORD", "secret")
        .args(["-u", "alice", "--config"])
        .arg(&config)
        .arg("http://127.0.0.1:1/db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_replays"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_fetches_document_with_session_cookie() {
    let Some(server) = mock_server().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path("/_session"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "AuthSession=cli; Path=/; HttpOnly")
                .set_body_json(json!({"ok": true, "userCtx": {"name": "alice", "roles": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/db/doc"))
        .and(header("cookie", "AuthSession=cli"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "doc"})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let url = format!("{}/db/doc", server.uri());
    let mut cmd = couch_session(&temp);
    cmd.env("COUCH_PASSWORD", "secret").args(["-q", "-u", "alice", url.as_str()]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"_id\":\"doc\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_reads_username_from_config_and_fails_on_error_status() {
    let Some(server) = mock_server().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path("/_session"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/db/doc"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("couch-session");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "username = \"bob\"\n").unwrap();

    let url = format!("{}/db/doc", server.uri());
    let mut cmd = couch_session(&temp);
    cmd.env("COUCH_PASSWORD", "wrong").args(["-q", url.as_str()]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("401"));
}

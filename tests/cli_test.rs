//! Command-line smoke tests for the `studyflow` binary

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::temp_config_file;

fn studyflow() -> Command {
    let mut cmd = Command::cargo_bin("studyflow").unwrap();
    cmd.env_remove("STUDYFLOW_API_URL")
        .env_remove("STUDYFLOW_TOKEN_STORE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    studyflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("announcements"));
}

#[test]
fn test_missing_subcommand_fails() {
    studyflow().assert().failure();
}

#[test]
fn test_chat_help_mentions_student_flag() {
    studyflow()
        .args(["chat", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--student"));
}

#[test]
fn test_invalid_api_url_is_rejected() {
    let (_dir, path) = temp_config_file("auth:\n  token_store: memory\n");
    studyflow()
        .args(["--config", path.to_str().unwrap(), "--api-url", "ftp://nowhere", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_url"));
}

#[test]
fn test_whoami_without_login_fails() {
    let (_dir, path) = temp_config_file(
        "server:\n  api_url: http://127.0.0.1:9\nauth:\n  token_store: memory\n",
    );
    studyflow()
        .args(["--config", path.to_str().unwrap(), "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

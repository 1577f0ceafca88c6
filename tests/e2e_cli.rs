//! CLI end-to-end tests
//!
//! Tests for the fastlite command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the fastlite binary
#[allow(deprecated)]
fn fastlite_cmd() -> Command {
    Command::cargo_bin("fastlite").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = fastlite_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = fastlite_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fastlite"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = fastlite_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_exec_prints_rows_and_count() {
    let dir = tempdir().unwrap();
    let data_source = format!("Data Source={}", dir.path().join("exec.db").display());

    let mut cmd = fastlite_cmd();
    cmd.args([
        "exec",
        "--data-source",
        &data_source,
        "CREATE TABLE t (a, b); INSERT INTO t VALUES (1, 'one'), (2, NULL); SELECT a, b FROM t ORDER BY a;",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("1\tone"))
    .stdout(predicate::str::contains("2\tNULL"))
    .stdout(predicate::str::contains("2 rows affected"));

    // The file persists between invocations.
    let mut cmd = fastlite_cmd();
    cmd.args(["exec", "-d", &data_source, "SELECT count(*) FROM t"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2\n"));
}

#[test]
fn test_cli_exec_reports_sql_errors() {
    let mut cmd = fastlite_cmd();
    cmd.args(["exec", "SELEC 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SQLite Error 1"));
}

#[test]
fn test_cli_exec_rejects_bad_connection_string() {
    let mut cmd = fastlite_cmd();
    cmd.args(["exec", "-d", "Mode=Sideways;Data Source=x.db", "SELECT 1"])
        .assert()
        .failure();
}

#[test]
fn test_cli_pragmas_json() {
    let dir = tempdir().unwrap();
    let data_source = format!("Data Source={}", dir.path().join("pragmas.db").display());

    let mut cmd = fastlite_cmd();
    cmd.args(["pragmas", "--json", "-d", &data_source])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"journal_mode\": \"wal\""))
        .stdout(predicate::str::contains("\"cache_size\": 25000"))
        .stdout(predicate::str::contains("\"page_size\": 4096"));
}

#[test]
fn test_cli_pragmas_with_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pool.json");
    fs::write(&config_path, r#"{"pragmas": {"cache_size": 1234}}"#).unwrap();
    let data_source = format!("Data Source={}", dir.path().join("cfg.db").display());

    let mut cmd = fastlite_cmd();
    cmd.args(["--config"])
        .arg(&config_path)
        .args(["pragmas", "--json", "-d", &data_source])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cache_size\": 1234"));
}

#[test]
fn test_cli_validate_defaults() {
    let mut cmd = fastlite_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_warns() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pool.json");
    fs::write(&config_path, r#"{"capacity": 0}"#).unwrap();

    let mut cmd = fastlite_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity is 0"));
}

#[test]
fn test_cli_validate_rejects_malformed_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pool.json");
    fs::write(&config_path, "{ not json").unwrap();

    let mut cmd = fastlite_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn test_cli_bench_small_run() {
    let mut cmd = fastlite_cmd();
    cmd.args(["bench", "-n", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Executions:   10"))
        .stdout(predicate::str::contains("Fast query:"))
        .stdout(predicate::str::contains("Command:"));
}

//! CLI integration tests
//!
//! Tests the adt CLI using assert_cmd. Every test gets its own config file
//! and state directory; the configured server address refuses connections.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "server_address = '127.0.0.1:1'\n\
             server_executable = '{}'\n\
             settle_interval = 0\n\
             test_timeout = 2\n\
             state_dir = '{}'\n",
            dir.path().join("no-such-server").display(),
            dir.path().join("state").display(),
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn adt(&self) -> Command {
        let mut cmd = adt();
        cmd.arg("--config")
            .arg(self.config_path())
            .env_remove("ADT_SERVER_DEBUG")
            .env("ADT_USER", "DEVELOPER")
            .env("ADT_PASSWORD", "Down1oad");
        cmd
    }
}

fn adt() -> Command {
    Command::cargo_bin("adt").expect("Failed to locate adt binary - ensure it's built before running tests")
}

#[test]
fn test_cli_help() {
    adt()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("adt"))
        .stdout(predicate::str::contains("ABAP systems"));
}

#[test]
fn test_cli_version() {
    adt()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adt"));
}

#[test]
fn test_cli_connections_help() {
    adt()
        .args(["connections", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connections"));
}

#[test]
fn test_cli_add_rfc_help() {
    adt()
        .args(["connections", "add", "rfc", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--message-server"));
}

#[test]
fn test_cli_unknown_command() {
    adt()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_connect_missing_name() {
    adt().arg("connect").assert().failure();
}

#[test]
fn test_cli_config_show() {
    let sandbox = Sandbox::new();
    sandbox
        .adt()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("server_address = \"127.0.0.1:1\""))
        .stdout(predicate::str::contains("test_timeout = 2"));
}

#[test]
fn test_cli_config_path() {
    let sandbox = Sandbox::new();
    sandbox
        .adt()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_cli_missing_explicit_config() {
    adt()
        .args(["--config", "/nonexistent/adt/config.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_cli_catalog_lifecycle() {
    let sandbox = Sandbox::new();

    sandbox
        .adt()
        .args(["connections", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No connections declared"));

    sandbox
        .adt()
        .args(["connections", "add", "http", "dev", "-s", "a4h", "--port", "44300"])
        .assert()
        .success();

    sandbox
        .adt()
        .args(["connections", "add", "http", "dev", "-s", "NPL"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dev"));

    sandbox
        .adt()
        .args(["connections", "list", "--long"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A4H"))
        .stdout(predicate::str::contains("https://127.0.0.1:44300"))
        .stdout(predicate::str::contains("disconnected"));

    assert!(sandbox.dir.path().join("state/connections.json").exists());

    sandbox
        .adt()
        .args(["connections", "remove", "dev"])
        .assert()
        .success();

    sandbox
        .adt()
        .args(["connections", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No connections declared"));
}

#[test]
fn test_cli_connect_unreachable_server() {
    let sandbox = Sandbox::new();
    sandbox
        .adt()
        .args(["connections", "add", "http", "dev", "-s", "A4H"])
        .assert()
        .success();

    sandbox
        .adt()
        .args(["connect", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect 'dev'"));

    // The folder is mounted but lists empty while offline
    sandbox
        .adt()
        .args(["ls", "adt://A4H"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("A4H is not connected"));

    sandbox
        .adt()
        .args(["ls", "adt://NPL"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot list adt://NPL"));
}

#[test]
fn test_cli_unknown_connection() {
    let sandbox = Sandbox::new();
    sandbox
        .adt()
        .args(["disconnect", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No connection named 'ghost'"));
}

#[test]
fn test_cli_restore_with_nothing_parked() {
    let sandbox = Sandbox::new();
    sandbox
        .adt()
        .arg("restore")
        .assert()
        .success()
        .stderr(predicate::str::contains("No parked connections"));
}

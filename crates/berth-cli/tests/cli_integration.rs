//! CLI subprocess integration tests.
//!
//! These tests invoke the `berth` binary against the mock engine and verify
//! exit codes, stdout content, and JSON output stability.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn berth_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_berth"));
    cmd.env_remove("BERTH_CONFIG");
    cmd.env_remove("BERTH_LOG");
    cmd
}

fn write_config(dir: &Path, options: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            r#"up_attempts = 1

[backend]
engine = "mock"
provider = "mock"

[backend.options]
{options}

[readiness]
settle_delay_ms = 0
"#
        ),
    )
    .unwrap();
    path
}

fn berth(config: &Path, args: &[&str]) -> Output {
    berth_bin()
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn cli_version_exits_zero() {
    let output = berth_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "berth --version must exit 0");
    assert!(stdout(&output).contains("berth"));
}

#[test]
fn cli_help_lists_commands() {
    let output = berth_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "berth --help must exit 0");
    let text = stdout(&output);
    for command in ["up", "down", "list", "start", "exec", "run", "doctor"] {
        assert!(text.contains(command), "help must list '{command}': {text}");
    }
}

#[test]
fn cli_list_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["list"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("no containers found"));
}

#[test]
fn cli_list_json_is_array() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["--json", "list"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn cli_up_reports_missing_provider() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "installed = false");

    let output = berth(&config, &["up"]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(
        stderr(&output).contains("mock is NOT installed!"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn cli_list_blocked_when_provider_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "installed = false");

    let output = berth(&config, &["list"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("is NOT installed!"));
}

#[test]
fn cli_status_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["--json", "status"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["engine"], "mock");
    assert_eq!(parsed["provider"], "mock");
    assert_eq!(parsed["up"], true);
    assert_eq!(parsed["probe"], "delay");
}

#[test]
fn cli_exists_unknown_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["exists", "ghost"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), "false");
}

#[test]
fn cli_start_unknown_container_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["--json", "start", "ghost"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("not found"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn cli_start_rejects_bad_options_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["start", "web", "--options", "{not json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid --options JSON"));
}

#[test]
fn cli_run_streams_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["run", "alpine", "--", "echo", "hello"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "hello\n");
}

#[test]
fn cli_create_rejects_malformed_label() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["create", "--image", "alpine", "--label", "novalue"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid label"));
}

#[test]
fn cli_doctor_passes_on_mock() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth(&config, &["--json", "doctor"]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["healthy"], true);
    assert!(parsed["checks"].as_array().is_some_and(|c| !c.is_empty()));
}

#[test]
fn cli_doctor_flags_missing_provider() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "installed = false");

    let output = berth(&config, &["doctor"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("mock is NOT installed!"));
}

#[test]
fn cli_unknown_engine_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[backend]\nengine = \"nope\"\nprovider = \"mock\"\n").unwrap();

    let output = berth(&path, &["list"]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("config error"));
}

#[test]
fn cli_missing_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = berth(&dir.path().join("absent.toml"), &["list"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_config_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = berth_bin()
        .env("BERTH_CONFIG", &config)
        .args(["--json", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

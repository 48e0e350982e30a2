//! Tests that run the compiled `loopbus` binary

use std::fs;
use std::process::Command;

fn loopbus_quiet() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_loopbus"));
    command.args(["--no-color", "--log-level", "off"]);
    command
}

#[test]
fn test_demo_run_exits_with_requested_code() {
    let output = loopbus_quiet()
        .args(["--producers", "2", "--messages", "20", "--exit-code", "5"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demo"), "{stdout}");
    assert!(stdout.contains("40 messages"), "{stdout}");
}

#[test]
fn test_missing_config_file_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_loopbus"))
        .arg("--no-color")
        .arg("--config-file")
        .arg(dir.path().join("missing.toml"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR FATAL: Configuration error"), "{stderr}");
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn test_config_file_log_level_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loopbus.toml");
    fs::write(&path, "[demo]\nproducers = 1\nmessages = 5\n\n[log]\nlevel = \"debug\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_loopbus"))
        .arg("--no-color")
        .arg("--config-file")
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DBG Resolved settings"), "{stderr}");
}

#[test]
fn test_command_line_log_level_wins_over_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loopbus.toml");
    fs::write(&path, "[demo]\nproducers = 1\nmessages = 5\n\n[log]\nlevel = \"debug\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_loopbus"))
        .args(["--no-color", "--log-level", "warn", "--config-file"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("DBG"));
}

#[test]
fn test_version_includes_build_details() {
    let output = Command::new(env!("CARGO_BIN_EXE_loopbus"))
        .arg("--version")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("loopbus"), "{stdout}");
    assert!(stdout.contains(" built "), "{stdout}");
    assert!(stdout.contains("UTC"), "{stdout}");
}

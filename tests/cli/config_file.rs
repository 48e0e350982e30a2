//! CLI TOML configuration tests

use clap::Parser;
use loopbus::app::cli::args::Args;
use loopbus::app::cli::config::{ConfigError, FileConfig, Settings};
use std::fs;
use std::time::Duration;

#[test]
fn test_cli_overrides_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loopbus.toml");
    fs::write(
        &path,
        "[loop]\ndrain_timeout_ms = 900\n\n[demo]\nproducers = 2\nobservers = 4\n\n[log]\nlevel = \"error\"\n",
    )
    .unwrap();

    let args = Args::try_parse_from([
        "loopbus",
        "--config-file",
        path.to_str().unwrap(),
        "--producers",
        "6",
        "--log-level",
        "trace",
    ])
    .unwrap();
    let file_config = FileConfig::load(args.config_file.as_deref()).unwrap();
    let settings = Settings::resolve(&args, &file_config).unwrap();

    assert_eq!(settings.demo.producers, 6);
    assert_eq!(settings.demo.observers, 4);
    assert_eq!(
        settings.demo.loop_config.drain_timeout,
        Some(Duration::from_millis(900))
    );
    assert_eq!(settings.log_level, "trace");
}

#[test]
fn test_invalid_toml_value_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loopbus.toml");
    fs::write(&path, "[loop]\ndrain_timeout_ms = -5\n").unwrap();

    assert!(matches!(
        FileConfig::load(Some(&path)),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_log_format_is_not_a_file_setting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loopbus.toml");
    fs::write(&path, "[log]\nformat = \"json\"\n").unwrap();

    assert!(matches!(
        FileConfig::load(Some(&path)),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_zero_observers_rejected() {
    let args = Args::try_parse_from(["loopbus", "--observers", "0"]).unwrap();

    assert!(matches!(
        Settings::resolve(&args, &FileConfig::default()),
        Err(ConfigError::Invalid { .. })
    ));
}

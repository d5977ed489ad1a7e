//! Integration tests for `scangate config`.
//!
//! Tests config loading with real TOML files and runs the built binary
//! to check output and exit codes.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

use scangate_core::config::ScangateConfig;

fn scangate(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scangate"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("should run scangate binary")
}

const FULL_CONFIG: &str = r#"
[general]
log_level = "debug"
log_format = "pretty"

[server]
url = "https://scan.example.com"
username = "ci-bot"
password = "hunter2"

[global]
force_thresholds = true
lock_thresholds = false
status_on_error = "unstable"
scan_timeout_enabled = true
scan_timeout_minutes = 30

[global.sast_limits]
high = 0

[job]
project_name = "payments"
group_id = "7"
preset = "Default"
incremental = true
full_scans_scheduled = true
full_scan_cycle = 9
thresholds_enabled = true
status_on_error = "global"

[job.sast_limits]
high = 2
medium = 10

[job.osa]
enabled = true
include = "**/*.jar"
"#;

#[tokio::test]
async fn test_config_load_full_config() {
    // Given: A config file with every section
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, FULL_CONFIG).expect("should write config");

    // When: Loading the config
    let config = ScangateConfig::load(&config_path)
        .await
        .expect("full config should load");

    // Then: Every section is populated
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.server.username, "ci-bot");
    assert!(config.global.force_thresholds);
    assert_eq!(config.global.sast_limits.high, Some(0));
    assert_eq!(config.job.project_name, "payments");
    assert_eq!(config.job.full_scan_cycle, 9);
    assert_eq!(config.job.sast_limits.medium, Some(10));
    assert!(config.job.osa.enabled);
}

#[tokio::test]
async fn test_config_load_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").expect("should write empty file");

    let config = ScangateConfig::load(&config_path)
        .await
        .expect("empty config should use defaults");
    assert!(config.job.wait_for_results);
    assert!(!config.job.thresholds_enabled);
}

#[tokio::test]
async fn test_config_load_malformed_toml_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write");

    assert!(ScangateConfig::load(&config_path).await.is_err());
}

#[test]
fn test_config_validate_valid_file_exits_zero() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, FULL_CONFIG).expect("should write config");

    let output = scangate(&config_path, &["config", "validate"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("VALID"), "stdout: {stdout}");
}

#[test]
fn test_config_validate_invalid_url_exits_two() {
    // Given: A server url without scheme
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, "[server]\nurl = \"scan.example.com\"\n").expect("should write");

    // When: Validating
    let output = scangate(&config_path, &["config", "validate"]);

    // Then: Config error exit code and the offending field in the report
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("INVALID"));
    assert!(stdout.contains("server.url"));
}

#[test]
fn test_config_validate_missing_file_exits_two() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let output = scangate(&temp_dir.path().join("nope.toml"), &["config", "validate"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_validate_json_output() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, FULL_CONFIG).expect("should write config");

    let output = scangate(&config_path, &["--output", "json", "config", "validate"]);

    assert_eq!(output.status.code(), Some(0));
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(parsed["valid"].as_bool(), Some(true));
    assert_eq!(parsed["errors"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_config_show_redacts_password() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, FULL_CONFIG).expect("should write config");

    let output = scangate(&config_path, &["config", "show"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("hunter2"), "password must not be shown");
    assert!(stdout.contains("***REDACTED***"));
    assert!(stdout.contains("payments"));
}

#[test]
fn test_config_show_single_section() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, FULL_CONFIG).expect("should write config");

    let output = scangate(&config_path, &["config", "show", "--section", "job"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[job]"));
    assert!(stdout.contains("project_name"));
    assert!(!stdout.contains("ci-bot"), "server section is not shown");
}

#[test]
fn test_config_show_unknown_section_exits_one() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("scangate.toml");
    fs::write(&config_path, FULL_CONFIG).expect("should write config");

    let output = scangate(&config_path, &["config", "show", "--section", "network"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown section"));
}

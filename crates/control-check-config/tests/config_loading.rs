// crates/control-check-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: File resolution, size limits, and encoding checks.
// Purpose: Ensure explicit paths fail closed and file contents are validated.
// =============================================================================

//! Config loading tests for control-check-config.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;

use control_check_config::ConfigError;
use control_check_config::ControlCheckConfig;
use tempfile::TempDir;

type TestResult = Result<(), String>;

#[test]
fn explicit_missing_file_is_an_error() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match ControlCheckConfig::load(Some(&path)) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {:?}", other.map(|config| config.dry_run))),
    }
}

#[test]
fn explicit_file_is_loaded_and_recorded() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("control-check.toml");
    fs::write(&path, "dry_run = false\ndefault_target = \" https://target.example \"\n")
        .map_err(|err| err.to_string())?;
    let config = ControlCheckConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.dry_run {
        return Err("dry_run should be false".to_string());
    }
    if config.default_target != "https://target.example" {
        return Err(format!("default_target not trimmed: {}", config.default_target));
    }
    if config.source.as_deref() != Some(path.as_path()) {
        return Err("source path should be recorded".to_string());
    }
    Ok(())
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    match ControlCheckConfig::load(Some(&path)) {
        Err(ConfigError::Invalid(message)) if message.contains("size limit") => Ok(()),
        other => Err(format!("expected size error, got {:?}", other.map(|config| config.dry_run))),
    }
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    match ControlCheckConfig::load(Some(&path)) {
        Err(ConfigError::Invalid(message)) if message.contains("utf-8") => Ok(()),
        other => Err(format!("expected utf-8 error, got {:?}", other.map(|config| config.dry_run))),
    }
}

#[test]
fn invalid_values_in_file_fail_closed() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("control-check.toml");
    fs::write(&path, "[tools.database]\nconnect_timeout_ms = 60000\n")
        .map_err(|err| err.to_string())?;
    match ControlCheckConfig::load(Some(&path)) {
        Err(ConfigError::Invalid(message)) if message.contains("connect_timeout_ms") => Ok(()),
        other => Err(format!("expected invalid, got {:?}", other.map(|config| config.dry_run))),
    }
}

#[test]
fn overlong_path_component_is_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("c".repeat(300));
    match ControlCheckConfig::load(Some(&path)) {
        Err(ConfigError::Invalid(message)) if message.contains("component too long") => Ok(()),
        other => Err(format!("expected invalid, got {:?}", other.map(|config| config.dry_run))),
    }
}

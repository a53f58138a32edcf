// crates/control-check-tools/tests/remote_command.rs
// ============================================================================
// Module: Remote Command Live-Mode Tests
// Description: Live ssh invocation against a stand-in client script.
// Purpose: Verify output capture, exit-code mapping, and the exec deadline.
// Dependencies: control-check-tools, tempfile
// ============================================================================

//! ## Overview
//! The ssh client is replaced by a shell script so live-mode process handling
//! can be tested without a remote host.

#![cfg(unix)]
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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use std::time::Instant;

use control_check_core::Tool;
use control_check_core::ToolError;
use control_check_core::ToolPayload;
use control_check_tools::RemoteCommandConfig;
use control_check_tools::RemoteCommandTool;
use serde_json::json;
use tempfile::TempDir;

use crate::common::args;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn fake_ssh(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("ssh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn live_tool(program: &str, exec_timeout_ms: u64) -> RemoteCommandTool {
    RemoteCommandTool::new(
        RemoteCommandConfig {
            host: "db.internal".to_string(),
            ssh_program: program.to_string(),
            exec_timeout_ms,
            ..RemoteCommandConfig::default()
        },
        false,
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn captures_output_and_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_ssh(&dir, "for last; do :; done\necho \"ran: $last\"\necho warn >&2\nexit 3");
    let payload = live_tool(&program, 5_000).invoke(&args(json!({"cmd": "uname -a"}))).unwrap();
    let ToolPayload::CommandOutput(output) = payload else {
        panic!("unexpected payload");
    };
    assert_eq!(output.stdout, "ran: uname -a\n");
    assert_eq!(output.stderr, "warn\n");
    assert_eq!(output.exit_code, 3);
    assert_eq!(output.host, "db.internal");
    assert!(!output.simulated);
}

#[test]
fn ssh_failure_exit_code_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_ssh(&dir, "echo 'Connection refused' >&2\nexit 255");
    let err = live_tool(&program, 5_000).invoke(&args(json!({"cmd": "id"}))).unwrap_err();
    let ToolError::Connection(message) = err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(message.contains("Connection refused"));
}

#[test]
fn hung_command_is_killed_at_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_ssh(&dir, "exec sleep 30");
    let started = Instant::now();
    let err = live_tool(&program, 200).invoke(&args(json!({"cmd": "id"}))).unwrap_err();
    assert!(matches!(err, ToolError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn missing_client_is_a_configuration_error() {
    let err = live_tool(Path::new("/nonexistent/ssh").to_str().unwrap(), 1_000)
        .invoke(&args(json!({"cmd": "id"})))
        .unwrap_err();
    assert!(matches!(err, ToolError::Configuration(_)));
}

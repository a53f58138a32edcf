// crates/control-check-tools/src/ssh/tests.rs
// ============================================================================
// Module: Remote Command Unit Tests
// Description: ssh argument construction.
// Purpose: Pin the batch-mode flags and destination layout.
// Dependencies: control-check-tools
// ============================================================================

//! ## Overview
//! Verifies the argument vector handed to the ssh client.

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

use super::RemoteCommandConfig;
use super::ssh_args;

#[test]
fn args_use_batch_mode_and_end_with_destination_and_command() {
    let config = RemoteCommandConfig {
        host: "db.internal".to_string(),
        user: "audit".to_string(),
        port: 2222,
        identity_file: Some("/keys/audit".to_string()),
        connect_timeout_ms: 8_000,
        ..RemoteCommandConfig::default()
    };
    let args = ssh_args(&config, "cat /etc/ssh/sshd_config");
    assert_eq!(
        args,
        vec![
            "-o",
            "BatchMode=yes",
            "-o",
            "StrictHostKeyChecking=accept-new",
            "-o",
            "ConnectTimeout=8",
            "-p",
            "2222",
            "-i",
            "/keys/audit",
            "--",
            "audit@db.internal",
            "cat /etc/ssh/sshd_config",
        ]
    );
}

#[test]
fn sub_second_connect_timeout_rounds_up() {
    let config = RemoteCommandConfig {
        connect_timeout_ms: 250,
        ..RemoteCommandConfig::default()
    };
    let args = ssh_args(&config, "true");
    assert!(args.contains(&"ConnectTimeout=1".to_string()));
    assert!(!args.contains(&"-i".to_string()));
}

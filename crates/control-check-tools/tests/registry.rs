// crates/control-check-tools/tests/registry.rs
// ============================================================================
// Module: Tool Registry Tests
// Description: Routing, sealing, dry-run behavior, and registration rules.
// Purpose: Verify the registry never turns tool problems into errors.
// Dependencies: control-check-tools, control-check-core
// ============================================================================

//! ## Overview
//! Drives the registry through the core `ToolInvoker` interface the pipeline
//! uses and checks the sealed results.

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

use std::time::Duration;
use std::time::Instant;

use control_check_core::Step;
use control_check_core::Tool;
use control_check_core::ToolArgs;
use control_check_core::ToolError;
use control_check_core::ToolInvoker;
use control_check_core::ToolName;
use control_check_core::ToolPayload;
use control_check_tools::BuiltinToolConfigs;
use control_check_tools::RegistryError;
use control_check_tools::RemoteCommandConfig;
use control_check_tools::ToolRegistry;
use serde_json::json;

use crate::common::local_probe_config;
use crate::common::serve_once;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Echo;

impl Tool for Echo {
    fn invoke(&self, args: &ToolArgs) -> Result<ToolPayload, ToolError> {
        Ok(ToolPayload::failure(format!("echo {}", args.len())))
    }
}

fn dry_run_registry() -> ToolRegistry {
    ToolRegistry::with_builtin_tools(BuiltinToolConfigs {
        dry_run: true,
        http: local_probe_config(),
        ssh: RemoteCommandConfig {
            host: "unreachable.invalid".to_string(),
            ..RemoteCommandConfig::default()
        },
        ..BuiltinToolConfigs::default()
    })
    .unwrap()
}

// ============================================================================
// SECTION: Registration
// ============================================================================

#[test]
fn builtin_registry_exposes_three_tools() {
    let registry = dry_run_registry();
    assert_eq!(registry.names(), vec!["data_query", "network_probe", "remote_command"]);
    assert!(registry.has_tool(&ToolName::new("remote_command")));
    assert!(!registry.has_tool(&ToolName::new("port_scan")));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = ToolRegistry::new();
    registry.register("echo", Echo).unwrap();
    assert_eq!(
        registry.register("echo", Echo).unwrap_err(),
        RegistryError::DuplicateTool("echo".to_string())
    );
}

#[test]
fn require_reports_missing_tools() {
    let mut registry = ToolRegistry::new();
    registry.register("network_probe", Echo).unwrap();
    let err = registry.require(["network_probe", "remote_command", "data_query"]).unwrap_err();
    assert_eq!(err, RegistryError::MissingTools("remote_command, data_query".to_string()));
    assert!(registry.require(["network_probe"]).is_ok());
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

#[test]
fn dry_run_remote_command_never_connects() {
    let registry = dry_run_registry();
    let started = Instant::now();
    let result = registry.invoke(&Step::with_arg("remote_command", "cmd", "rm -rf /tmp/x")).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let ToolPayload::CommandOutput(output) = &result.payload else {
        panic!("unexpected payload: {:?}", result.payload);
    };
    assert_eq!(output.stdout, "DRY_RUN: no-op");
    assert_eq!(output.stderr, "");
    assert_eq!(output.exit_code, 0);
    assert!(output.simulated);
    assert_eq!(output.command, "rm -rf /tmp/x");
    assert!(result.verify().unwrap());
    assert_eq!(result.args.get("cmd"), Some(&json!("rm -rf /tmp/x")));
}

#[test]
fn dry_run_data_query_returns_note() {
    let registry = dry_run_registry();
    let result =
        registry.invoke(&Step::with_arg("data_query", "sql", "SHOW VARIABLES LIKE 'ssl%'")).unwrap();
    let ToolPayload::QueryRows(rows) = &result.payload else {
        panic!("unexpected payload: {:?}", result.payload);
    };
    assert!(rows.rows.is_empty());
    assert!(rows.columns.is_empty());
    assert_eq!(rows.note.as_deref(), Some("DRY_RUN: no DB connection"));
    assert!(rows.simulated);
}

#[test]
fn unknown_tool_yields_marker_payload() {
    let registry = dry_run_registry();
    let result = registry.invoke(&Step::with_arg("port_scan", "host", "example.com")).unwrap();
    let ToolPayload::UnknownTool(note) = &result.payload else {
        panic!("unexpected payload: {:?}", result.payload);
    };
    assert_eq!(note.note, "no such tool: port_scan");
    assert!(result.verify().unwrap());
}

#[test]
fn tool_errors_become_failure_payloads() {
    let registry = dry_run_registry();
    let step = Step {
        tool: ToolName::new("remote_command"),
        args: ToolArgs::new(),
    };
    let result = registry.invoke(&step).unwrap();
    assert_eq!(
        result.payload,
        ToolPayload::failure("invalid tool arguments: missing cmd argument")
    );
}

#[test]
fn network_probe_result_is_sealed() {
    let registry = dry_run_registry();
    let (url, handle) = serve_once(200, &[("Content-Security-Policy", "default-src 'self'")], "");
    let result = registry.invoke(&Step::with_arg("network_probe", "url", url.as_str())).unwrap();
    handle.join().unwrap();
    assert!(result.verify().unwrap());
    let observation = result.payload.as_http().unwrap();
    assert!(observation.headers.contains_key("content-security-policy"));
}

#[test]
fn identical_payloads_share_a_hash_regardless_of_args() {
    let mut registry = ToolRegistry::new();
    registry.register("echo", Echo).unwrap();
    let first = registry.invoke(&Step::with_arg("echo", "a", "1")).unwrap();
    let second = registry.invoke(&Step::with_arg("echo", "b", "2")).unwrap();
    assert_eq!(first.content_hash, second.content_hash);
    assert_ne!(first.args, second.args);
}

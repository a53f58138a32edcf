// crates/control-check-tools/src/db/tests.rs
// ============================================================================
// Module: Data Query Unit Tests
// Description: Result-set shaping and credential resolution.
// Purpose: Pin row truncation, empty results, and password handling.
// Dependencies: control-check-tools, serde_json
// ============================================================================

//! ## Overview
//! Exercises the observation builder without a server and checks that a
//! missing password variable fails before any connection attempt.

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

use control_check_core::Tool;
use control_check_core::ToolArgs;
use control_check_core::ToolError;
use serde_json::Value;
use serde_json::json;

use super::DataQueryConfig;
use super::DataQueryTool;
use super::observation;

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn numbered_rows(count: i64) -> Vec<Vec<Value>> {
    (1..=count).map(|id| vec![json!(id), json!(format!("user{id}"))]).collect()
}

#[test]
fn rows_beyond_limit_are_truncated_with_note() {
    let sql = "SELECT id, name FROM users";
    let observed = observation(sql, columns(&["id", "name"]), numbered_rows(5), 3);
    assert_eq!(observed.columns, vec!["id", "name"]);
    assert_eq!(observed.rows.len(), 3);
    assert_eq!(observed.rows[2], vec![json!(3), json!("user3")]);
    assert_eq!(observed.note.as_deref(), Some("truncated to 3 of 5 rows"));
    assert!(!observed.simulated);
}

#[test]
fn rows_at_limit_carry_no_note() {
    let sql = "SELECT id, name FROM users";
    let observed = observation(sql, columns(&["id", "name"]), numbered_rows(3), 3);
    assert_eq!(observed.rows.len(), 3);
    assert!(observed.note.is_none());
}

#[test]
fn empty_result_keeps_column_names() {
    let observed = observation(
        "SHOW VARIABLES LIKE 'nothing%'",
        columns(&["Variable_name", "Value"]),
        Vec::new(),
        10,
    );
    assert_eq!(observed.columns, vec!["Variable_name", "Value"]);
    assert!(observed.rows.is_empty());
    assert!(observed.note.is_none());
    assert_eq!(observed.query, "SHOW VARIABLES LIKE 'nothing%'");
}

#[test]
fn unset_password_variable_is_a_configuration_error() {
    let config = DataQueryConfig {
        host: "192.0.2.1".to_string(),
        password_env: "CONTROL_CHECK_TEST_PASSWORD_NEVER_SET_4D2A".to_string(),
        ..DataQueryConfig::default()
    };
    let tool = DataQueryTool::new(config, false);
    let mut args = ToolArgs::new();
    args.insert("sql".to_string(), json!("SELECT 1"));

    let err = tool.invoke(&args).unwrap_err();
    let expected = "CONTROL_CHECK_TEST_PASSWORD_NEVER_SET_4D2A is not set";
    assert_eq!(err, ToolError::Configuration(expected.to_string()));
}

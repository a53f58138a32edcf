// crates/control-check-cli/tests/cli.rs
// ============================================================================
// Module: CLI Integration Tests
// Description: Drives the `control-check` binary against temporary stores.
// Purpose: Verify the submit, work, and inspect flow across processes.
// Dependencies: control-check-cli, serde_json, tempfile
// ============================================================================

//! CLI integration tests.

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
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a config using a `SQLite` store inside `dir`.
fn sqlite_config(dir: &Path) -> PathBuf {
    let db = dir.join("jobs.db");
    let path = dir.join("control-check.toml");
    let content = format!(
        "dry_run = true\ndefault_target = \"https://example.com\"\n\n[store]\ntype = \
         \"sqlite\"\npath = '{}'\n",
        db.display()
    );
    fs::write(&path, content).unwrap();
    path
}

/// Writes a config using the in-memory store.
fn memory_config(dir: &Path) -> PathBuf {
    let path = dir.join("memory.toml");
    fs::write(&path, "[store]\ntype = \"memory\"\n").unwrap();
    path
}

/// Runs the binary with `--config` and the given arguments.
fn control_check(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_control-check"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("CONTROL_CHECK_CONFIG")
        .output()
        .unwrap()
}

/// Parses the single JSON document printed on stdout.
fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Parses JSON lines printed on stdout.
fn stdout_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn submit_then_work_across_processes() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    let submitted = stdout_json(&control_check(&config, &["submit", "--control", "Z99"]));
    assert_eq!(submitted["status"], "queued");
    let job_id = submitted["job_id"].as_str().unwrap().to_string();

    let worked = stdout_json(&control_check(&config, &["work", &job_id]));
    assert_eq!(worked["job"]["status"], "done");
    assert_eq!(worked["summary"]["unknown"], 1);
    assert!(worked["error"].is_null());

    let report = stdout_json(&control_check(&config, &["report", &job_id]));
    assert_eq!(report["findings"][0]["control_id"], "Z99");
    assert_eq!(report["findings"][0]["finding"], "No rule");

    let jobs = stdout_json(&control_check(&config, &["jobs"]));
    assert_eq!(jobs.as_array().unwrap().len(), 1);

    let artifacts = stdout_json(&control_check(&config, &["artifacts", &job_id]));
    assert!(artifacts.as_array().unwrap().is_empty());
}

#[test]
fn events_print_history_and_honor_cursor() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());
    let submitted = stdout_json(&control_check(&config, &["submit", "--control", "Z99"]));
    let job_id = submitted["job_id"].as_str().unwrap().to_string();
    stdout_json(&control_check(&config, &["work", &job_id]));

    let all = stdout_lines(&control_check(&config, &["events", &job_id, "--follow"]));
    assert!(all.len() > 2);
    assert_eq!(all[0]["seq"], 1);
    assert_eq!(all[0]["message"], "job submitted");
    assert_eq!(all.last().unwrap()["message"], "job completed");
    assert_eq!(all.last().unwrap()["terminal"], true);
    assert!(all[.. all.len() - 1].iter().all(|event| event["terminal"] == false));

    let tail = stdout_lines(&control_check(&config, &["events", &job_id, "--after", "2"]));
    assert_eq!(tail.len(), all.len() - 2);
    assert_eq!(tail[0]["seq"], 3);
}

#[test]
fn work_rejects_job_that_already_ran() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());
    let submitted = stdout_json(&control_check(&config, &["submit", "--control", "Z99"]));
    let job_id = submitted["job_id"].as_str().unwrap().to_string();
    stdout_json(&control_check(&config, &["work", &job_id]));

    let second = control_check(&config, &["work", &job_id]);
    assert!(!second.status.success());
}

#[test]
fn run_with_memory_store_completes_in_one_invocation() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(dir.path());

    let output = stdout_json(&control_check(
        &config,
        &["run", "--target", "https://example.com", "--control", "Z98,Z99"],
    ));

    assert_eq!(output["job"]["status"], "done");
    assert_eq!(output["findings"].as_array().unwrap().len(), 2);
    assert_eq!(output["summary"]["unknown"], 2);
}

#[test]
fn show_unknown_job_fails() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    let output = control_check(&config, &["show", "missing"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("job not found: missing"));
}

#[test]
fn config_check_reports_source_and_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    let ok = stdout_json(&control_check(&config, &["config", "check"]));
    assert_eq!(ok["status"], "ok");
    assert!(ok["source"].as_str().unwrap().ends_with("control-check.toml"));

    let missing = control_check(&dir.path().join("absent.toml"), &["config", "check"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("config io error"));
}

#[test]
fn config_example_prints_every_section() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(dir.path());

    let output = control_check(&config, &["config", "example"]);

    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    for section in ["[assist]", "[tools.http]", "[store]", "[audit]", "[[controls]]"] {
        assert!(text.contains(section), "example missing {section}");
    }
}

#[test]
fn controls_lists_builtin_catalog() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(dir.path());

    let controls = stdout_json(&control_check(&config, &["controls"]));

    let ids: Vec<&str> =
        controls.as_array().unwrap().iter().map(|c| c["control_id"].as_str().unwrap()).collect();
    for id in ["U31", "U32", "U33"] {
        assert!(ids.contains(&id), "catalog missing {id}");
    }
}

// crates/control-check-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults Tests
// Description: Validate default values and the canonical example.
// Purpose: Ensure an empty config is valid and matches documented defaults.
// =============================================================================

//! Config defaults tests for control-check-config.

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

use std::path::PathBuf;

use control_check_config::AssistMode;
use control_check_config::AuditSinkType;
use control_check_config::ControlCheckConfig;
use control_check_config::DEFAULT_STORE_PATH;
use control_check_config::StoreType;
use control_check_config::config_toml_example;
use control_check_core::ControlId;
use control_check_core::ControlKind;
use control_check_core::ControlRetriever;
use control_check_core::HeaderMergePolicy;

mod common;

type TestResult = Result<(), String>;

#[test]
fn empty_config_validates_with_documented_defaults() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if !config.dry_run {
        return Err("dry_run should default to true".to_string());
    }
    if config.default_target != "https://example.com" {
        return Err(format!("unexpected default_target {}", config.default_target));
    }
    if config.assist.mode != AssistMode::Fallback {
        return Err("assist.mode should default to fallback".to_string());
    }
    if config.assist.chat.model != "gpt-5-mini" || config.assist.chat.api_key_env != "OPENAI_API_KEY"
    {
        return Err("unexpected assist.chat defaults".to_string());
    }
    if config.tools.ssh.user != "ubuntu" || config.tools.ssh.connect_timeout_ms != 8_000 {
        return Err("unexpected ssh defaults".to_string());
    }
    if config.tools.database.user != "readonly" || config.tools.database.port != 3306 {
        return Err("unexpected database defaults".to_string());
    }
    if config.tools.http.body_sample_bytes != 512 || !config.tools.http.allow_http {
        return Err("unexpected http defaults".to_string());
    }
    if config.audit.sink_type != AuditSinkType::None {
        return Err("audit sink should default to none".to_string());
    }
    if config.decision.header_merge != HeaderMergePolicy::LastWins {
        return Err("header_merge should default to last_wins".to_string());
    }
    Ok(())
}

#[test]
fn default_store_is_sqlite_at_default_path() -> TestResult {
    let config = ControlCheckConfig::default();
    if config.store.store_type != StoreType::Sqlite {
        return Err("store should default to sqlite".to_string());
    }
    let sqlite = config.store.sqlite_config().ok_or("sqlite config missing")?;
    if sqlite.path != PathBuf::from(DEFAULT_STORE_PATH) {
        return Err(format!("unexpected store path {}", sqlite.path.display()));
    }
    Ok(())
}

#[test]
fn memory_store_has_no_sqlite_config() -> TestResult {
    let config =
        ControlCheckConfig::from_toml_str("[store]\ntype = \"memory\"\n").map_err(|err| err.to_string())?;
    if config.store.sqlite_config().is_some() {
        return Err("memory store should not produce sqlite config".to_string());
    }
    Ok(())
}

#[test]
fn tool_configs_carry_dry_run_flag() -> TestResult {
    let config = ControlCheckConfig::from_toml_str("dry_run = false\n[tools.ssh]\nhost = \"db01\"\n")
        .map_err(|err| err.to_string())?;
    let tools = config.tool_configs();
    if tools.dry_run || tools.ssh.host != "db01" {
        return Err("tool configs should reflect the file".to_string());
    }
    Ok(())
}

#[test]
fn canonical_example_parses_and_validates() -> TestResult {
    let config = ControlCheckConfig::from_toml_str(&config_toml_example())
        .map_err(|err| err.to_string())?;
    if config.controls.len() != 1 || config.audit.sink_type != AuditSinkType::File {
        return Err("example should configure one control and a file sink".to_string());
    }
    Ok(())
}

#[test]
fn configured_controls_extend_the_catalog() -> TestResult {
    let config = ControlCheckConfig::from_toml_str(
        r#"
[[controls]]
control_id = "U31"
kind = "transport_security"
title = "U31: HSTS with preload"
check = "Verify Strict-Transport-Security includes preload."

[[controls]]
control_id = "U40"
title = "U40: Custom"
check = "Custom check"
"#,
    )
    .map_err(|err| err.to_string())?;
    let catalog = config.catalog();
    let replaced = catalog
        .control_definition(&ControlId::new("u31"))
        .map_err(|err| err.to_string())?;
    if replaced.title != "U31: HSTS with preload" {
        return Err(format!("built-in not replaced: {}", replaced.title));
    }
    let added = catalog
        .control_definition(&ControlId::new("U40"))
        .map_err(|err| err.to_string())?;
    if added.kind != ControlKind::Unclassified || added.check != "Custom check" {
        return Err("custom control should default to unclassified".to_string());
    }
    let builtin = catalog
        .control_definition(&ControlId::new("U32"))
        .map_err(|err| err.to_string())?;
    if builtin.kind != ControlKind::ContentSecurityPolicy {
        return Err("remaining built-ins should be kept".to_string());
    }
    Ok(())
}

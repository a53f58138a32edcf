// crates/control-check-core/tests/planner.rs
// ============================================================================
// Module: Planner Tests
// Description: Keyword fallback planning and generative delegation.
// Purpose: Pin which steps each control contributes.
// Dependencies: control-check-core
// ============================================================================

//! ## Overview
//! The fallback planner emits one network probe per control whose check text
//! mentions a web header marker. The generative planner passes collaborator
//! output through unchanged and surfaces its errors.

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

mod common;

use std::sync::Arc;

use control_check_core::CollaboratorError;
use control_check_core::ControlDefinition;
use control_check_core::ControlId;
use control_check_core::ControlRetriever;
use control_check_core::ControlSet;
use control_check_core::NETWORK_PROBE_TOOL;
use control_check_core::PlanError;
use control_check_core::Planner;
use control_check_core::StaticControlCatalog;
use control_check_core::Step;
use serde_json::json;

use crate::common::FixedPlanner;

fn builtin(ids: &[&str]) -> ControlSet {
    let catalog = StaticControlCatalog::builtin();
    ids.iter().map(|id| catalog.control_definition(&ControlId::new(*id)).unwrap()).collect()
}

fn with_check(id: &str, check: &str) -> ControlDefinition {
    ControlDefinition {
        check: check.to_string(),
        ..ControlDefinition::unclassified(ControlId::new(id))
    }
}

#[test]
fn fallback_probes_target_once_per_matching_control() {
    let steps = Planner::fallback().plan("https://example.com", &builtin(&["U31", "U32", "U33"])).unwrap();
    assert_eq!(steps.len(), 3);
    for step in &steps {
        assert_eq!(step.tool.as_str(), NETWORK_PROBE_TOOL);
        assert_eq!(step.args.get("url"), Some(&json!("https://example.com")));
    }
}

#[test]
fn fallback_emits_nothing_without_markers() {
    let set: ControlSet = [with_check("P1", "Verify password rotation policy")].into_iter().collect();
    let steps = Planner::fallback().plan("https://example.com", &set).unwrap();
    assert!(steps.is_empty());
}

#[test]
fn fallback_matches_markers_case_insensitively() {
    let set: ControlSet = [
        with_check("A", "Confirm HSTS is enabled"),
        with_check("B", "Unrelated"),
        with_check("C", "X-Frame-Options must be DENY"),
    ]
    .into_iter()
    .collect();
    let steps = Planner::fallback().plan("https://t.example", &set).unwrap();
    assert_eq!(steps.len(), 2);
}

#[test]
fn unknown_control_contributes_no_step() {
    let steps = Planner::fallback().plan("https://example.com", &builtin(&["Z99"])).unwrap();
    assert!(steps.is_empty());
}

#[test]
fn generative_planner_preserves_collaborator_order() {
    let planned = vec![
        Step::with_arg("remote_command", "cmd", "uname -a"),
        Step::with_arg(NETWORK_PROBE_TOOL, "url", "https://example.com"),
    ];
    let planner = Planner::generative(Arc::new(FixedPlanner(Ok(planned.clone()))));
    assert!(planner.is_generative());
    assert_eq!(planner.plan("https://example.com", &builtin(&["U31"])).unwrap(), planned);
}

#[test]
fn generative_planner_surfaces_missing_configuration() {
    let planner = Planner::generative(Arc::new(FixedPlanner(Err(
        CollaboratorError::MissingConfiguration("OPENAI_API_KEY not set".to_string()),
    ))));
    let err = planner.plan("https://example.com", &builtin(&["U31"])).unwrap_err();
    assert!(matches!(err, PlanError::Collaborator(CollaboratorError::MissingConfiguration(_))));
}

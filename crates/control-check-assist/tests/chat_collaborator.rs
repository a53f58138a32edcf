// crates/control-check-assist/tests/chat_collaborator.rs
// ============================================================================
// Module: Chat Collaborator Tests
// Description: Planning and decisioning against a fake chat endpoint.
// Purpose: Verify request shape, step mapping, and output validation.
// Dependencies: control-check-assist, control-check-core, tiny_http
// ============================================================================

//! Chat collaborator integration tests.

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

use control_check_assist::ChatClient;
use control_check_assist::ChatCollaborator;
use control_check_core::CollaboratorError;
use control_check_core::DecisionCollaborator;
use control_check_core::DecisionEngine;
use control_check_core::DecisionError;
use control_check_core::DecisionStatus;
use control_check_core::PlanningCollaborator;
use control_check_core::Planner;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Planning
// ============================================================================

#[test]
fn plan_maps_tool_calls_in_order() {
    let message = json!({
        "role": "assistant",
        "content": null,
        "tool_calls": [
            common::tool_call("network_probe", r#"{"url":"https://example.com"}"#),
            common::tool_call("remote_command", r#"{"cmd":"uname -a"}"#),
        ]
    });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let steps = collaborator.plan("https://example.com", &common::header_controls()).unwrap();
    let request = server.join().unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].tool.as_str(), "network_probe");
    assert_eq!(steps[0].args["url"], "https://example.com");
    assert_eq!(steps[1].tool.as_str(), "remote_command");
    assert_eq!(steps[1].args["cmd"], "uname -a");
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));
    assert_eq!(request.body["model"], "gpt-5-mini");
    assert_eq!(request.body["temperature"], 0);
    assert_eq!(request.body["tool_choice"], "auto");
    assert_eq!(request.body["tools"].as_array().unwrap().len(), 3);
}

#[test]
fn plan_sends_target_and_controls_as_user_message() {
    let message = json!({ "role": "assistant", "content": "nothing to do" });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    collaborator.plan("https://target.example", &common::header_controls()).unwrap();
    let request = server.join().unwrap();

    let messages = request.body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    let user: Value = serde_json::from_str(messages[1]["content"].as_str().unwrap()).unwrap();
    assert_eq!(user["task"], "plan");
    assert_eq!(user["target"], "https://target.example");
    assert_eq!(user["controls"][0]["control_id"], "U34");
    assert_eq!(user["controls"][1]["control_id"], "U35");
}

#[test]
fn plan_without_tool_calls_is_empty() {
    let message = json!({ "role": "assistant", "content": "no tools needed", "tool_calls": null });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let steps = collaborator.plan("https://example.com", &common::header_controls()).unwrap();
    server.join().unwrap();

    assert!(steps.is_empty());
}

#[test]
fn plan_rejects_malformed_arguments() {
    let message = json!({
        "role": "assistant",
        "tool_calls": [common::tool_call("network_probe", "{not json")]
    });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.plan("https://example.com", &common::header_controls()).unwrap_err();
    server.join().unwrap();

    match err {
        CollaboratorError::SchemaViolation(message) => {
            assert!(message.contains("network_probe"), "unexpected message: {message}");
        }
        other => panic!("expected schema violation, got {other:?}"),
    }
}

#[test]
fn plan_rejects_non_object_arguments() {
    let message = json!({
        "role": "assistant",
        "tool_calls": [common::tool_call("data_query", r#"["SELECT 1"]"#)]
    });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.plan("https://example.com", &common::header_controls()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, CollaboratorError::SchemaViolation(_)));
}

#[test]
fn generative_planner_surfaces_collaborator_errors() {
    let message = json!({ "role": "assistant", "tool_calls": "not a list" });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let planner = Planner::generative(Arc::new(common::collaborator(&endpoint)));

    let result = planner.plan("https://example.com", &common::header_controls());
    server.join().unwrap();

    assert!(result.is_err());
}

// ============================================================================
// SECTION: Decisioning
// ============================================================================

#[test]
fn decide_returns_validated_items() {
    let evidence = vec![common::http_evidence(
        "https://example.com",
        &[("strict-transport-security", "max-age=31536000")],
    )];
    let hash = evidence[0].content_hash.as_str().to_string();
    let content = json!({
        "items": [
            common::decision_item("U34", "pass", &[hash.as_str()]),
            common::decision_item("U35", "fail", &[hash.as_str()]),
        ],
        "summary": { "pass": 1, "partial": 0, "fail": 1, "unknown": 0 }
    });
    let message = json!({ "role": "assistant", "content": content.to_string() });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let decision = collaborator.decide(&evidence, &common::header_controls()).unwrap();
    let request = server.join().unwrap();

    assert_eq!(decision.items.len(), 2);
    assert_eq!(decision.items[0].status, DecisionStatus::Pass);
    assert_eq!(decision.items[1].status, DecisionStatus::Fail);
    assert_eq!(decision.items[0].evidence_refs[0].as_str(), hash);
    assert_eq!(decision.items[0].raw["control_id"], "U34");
    assert_eq!(decision.summary.pass, 1);
    assert_eq!(decision.summary.fail, 1);
    assert_eq!(request.body["response_format"]["type"], "json_schema");
    assert_eq!(request.body["response_format"]["json_schema"]["strict"], true);
    let user: Value =
        serde_json::from_str(request.body["messages"][1]["content"].as_str().unwrap()).unwrap();
    assert_eq!(user["task"], "decide");
    assert_eq!(user["evidence"][0]["content_hash"], hash.as_str());
}

#[test]
fn decide_rejects_missing_required_field() {
    let mut item = common::decision_item("U34", "pass", &[]);
    item.as_object_mut().unwrap().remove("recommendation");
    let content = json!({
        "items": [item],
        "summary": { "pass": 1, "partial": 0, "fail": 0, "unknown": 0 }
    });
    let message = json!({ "role": "assistant", "content": content.to_string() });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.decide(&[], &common::header_controls()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, CollaboratorError::SchemaViolation(_)), "got {err:?}");
}

#[test]
fn decide_rejects_non_json_content() {
    let message = json!({ "role": "assistant", "content": "All controls pass." });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.decide(&[], &common::header_controls()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, CollaboratorError::SchemaViolation(_)), "got {err:?}");
}

#[test]
fn decide_rejects_unknown_evidence_reference() {
    let content = json!({
        "items": [common::decision_item("U34", "pass", &["deadbeef"])],
        "summary": { "pass": 1, "partial": 0, "fail": 0, "unknown": 0 }
    });
    let message = json!({ "role": "assistant", "content": content.to_string() });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.decide(&[], &common::header_controls()).unwrap_err();
    server.join().unwrap();

    match err {
        CollaboratorError::SchemaViolation(message) => assert!(message.contains("deadbeef")),
        other => panic!("expected schema violation, got {other:?}"),
    }
}

#[test]
fn decide_reports_refusal() {
    let message = json!({ "role": "assistant", "content": null, "refusal": "cannot help" });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.decide(&[], &common::header_controls()).unwrap_err();
    server.join().unwrap();

    assert_eq!(err, CollaboratorError::SchemaViolation("model refused: cannot help".to_string()));
}

#[test]
fn generative_engine_rejects_missing_control() {
    let content = json!({
        "items": [common::decision_item("U34", "unknown", &[])],
        "summary": { "pass": 0, "partial": 0, "fail": 0, "unknown": 1 }
    });
    let message = json!({ "role": "assistant", "content": content.to_string() });
    let (endpoint, server) = common::serve_chat(200, &common::completion(message));
    let engine = DecisionEngine::generative(Arc::new(common::collaborator(&endpoint)));

    let result = engine.decide(&[], &common::header_controls());
    server.join().unwrap();

    assert!(matches!(result, Err(DecisionError::Coverage(_))), "got {result:?}");
}

// ============================================================================
// SECTION: Transport And Configuration
// ============================================================================

#[test]
fn http_error_status_is_transport_error() {
    let (endpoint, server) = common::serve_chat(500, &json!({ "error": "overloaded" }));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.plan("https://example.com", &common::header_controls()).unwrap_err();
    server.join().unwrap();

    assert_eq!(err, CollaboratorError::Transport("chat endpoint returned HTTP 500".to_string()));
}

#[test]
fn response_without_choices_is_schema_violation() {
    let (endpoint, server) = common::serve_chat(200, &json!({ "choices": [] }));
    let collaborator = common::collaborator(&endpoint);

    let err = collaborator.plan("https://example.com", &common::header_controls()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, CollaboratorError::SchemaViolation(_)));
}

#[test]
fn missing_api_key_fails_before_any_request() {
    let mut config = common::chat_config("http://127.0.0.1:9/v1");
    config.api_key_env = "CONTROL_CHECK_TEST_KEY_THAT_IS_NEVER_SET".to_string();
    let collaborator = ChatCollaborator::new(ChatClient::new(config).unwrap()).unwrap();

    let err = collaborator.plan("https://example.com", &common::header_controls()).unwrap_err();

    assert_eq!(
        err,
        CollaboratorError::MissingConfiguration(
            "CONTROL_CHECK_TEST_KEY_THAT_IS_NEVER_SET is not set".to_string()
        )
    );
}

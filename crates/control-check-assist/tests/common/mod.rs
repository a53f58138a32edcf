// crates/control-check-assist/tests/common/mod.rs
// ============================================================================
// Module: Assist Test Fixtures
// Description: Fake chat endpoint and evidence builders.
// Purpose: Share setup between assist integration tests.
// Dependencies: control-check-assist, control-check-core, tiny_http
// ============================================================================

//! ## Overview
//! Serves one canned chat-completions response on loopback and hands back the
//! request that was received so tests can inspect the outgoing body.

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures may panic on setup failures."
)]

use std::collections::BTreeMap;
use std::io::Read;
use std::thread;
use std::thread::JoinHandle;

use control_check_assist::ChatClient;
use control_check_assist::ChatCollaborator;
use control_check_assist::ChatConfig;
use control_check_core::ControlDefinition;
use control_check_core::ControlId;
use control_check_core::ControlKind;
use control_check_core::ControlSet;
use control_check_core::EvidenceItem;
use control_check_core::HttpObservation;
use control_check_core::ToolName;
use control_check_core::ToolPayload;
use control_check_core::ToolResult;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request observed by the fake endpoint.
pub struct CapturedRequest {
    /// Request path.
    pub path: String,
    /// Authorization header value.
    pub authorization: Option<String>,
    /// Parsed JSON body.
    pub body: Value,
}

/// Serves one response and returns the base URL plus the server thread.
pub fn serve_chat(status: u16, response: &Value) -> (String, JoinHandle<CapturedRequest>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let payload = response.to_string();
    let handle = thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut raw = String::new();
        request.as_reader().read_to_string(&mut raw).unwrap();
        let authorization = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_string());
        let captured = CapturedRequest {
            path: request.url().to_string(),
            authorization,
            body: serde_json::from_str(&raw).unwrap(),
        };
        let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
        let reply = Response::from_string(payload).with_status_code(status).with_header(content_type);
        let _ = request.respond(reply);
        captured
    });
    (format!("http://{addr}/v1"), handle)
}

/// Wraps a message in a chat-completions envelope.
pub fn completion(message: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
    })
}

/// Builds a tool call entry.
pub fn tool_call(name: &str, arguments: &str) -> Value {
    json!({
        "id": format!("call_{name}"),
        "type": "function",
        "function": { "name": name, "arguments": arguments }
    })
}

/// Chat settings pointed at `endpoint`.
pub fn chat_config(endpoint: &str) -> ChatConfig {
    ChatConfig {
        endpoint: endpoint.to_string(),
        timeout_ms: 5_000,
        ..ChatConfig::default()
    }
}

/// Collaborator with an explicit key, pointed at `endpoint`.
pub fn collaborator(endpoint: &str) -> ChatCollaborator {
    let client = ChatClient::with_api_key(chat_config(endpoint), "test-key").unwrap();
    ChatCollaborator::new(client).unwrap()
}

/// Two header controls in request order.
pub fn header_controls() -> ControlSet {
    let mut controls = ControlSet::new();
    controls.insert(control("U34", ControlKind::TransportSecurity, "Check HSTS header"));
    controls.insert(control("U35", ControlKind::ContentSecurityPolicy, "Check CSP header"));
    controls
}

/// Builds a control definition.
pub fn control(id: &str, kind: ControlKind, check: &str) -> ControlDefinition {
    ControlDefinition {
        control_id: ControlId::new(id),
        kind,
        title: format!("{id} title"),
        check: check.to_string(),
        standard: String::new(),
        improvement: String::new(),
        supporting: Vec::new(),
    }
}

/// Builds a sealed HTTP evidence item.
pub fn http_evidence(url: &str, headers: &[(&str, &str)]) -> EvidenceItem {
    let observation = HttpObservation {
        url: url.to_string(),
        status: 200,
        headers: headers
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect::<BTreeMap<_, _>>(),
        body_sample: String::new(),
        elapsed_ms: 5,
    };
    let result = ToolResult::seal(
        ToolName::new("network_probe"),
        serde_json::Map::new(),
        ToolPayload::HttpResponse(observation),
    )
    .unwrap();
    EvidenceItem::from(&result)
}

/// Builds one schema-complete decision item.
pub fn decision_item(control_id: &str, status: &str, refs: &[&str]) -> Value {
    json!({
        "control_id": control_id,
        "status": status,
        "evidence_refs": refs,
        "finding": format!("{control_id} observed"),
        "risk": "downgrade attacks",
        "recommendation": "enable the header",
        "repro": ["curl -I https://example.com"]
    })
}

// crates/control-check-tools/tests/common/mod.rs
// ============================================================================
// Module: Tool Test Fixtures
// Description: Local HTTP servers and argument builders.
// Purpose: Share setup between tool integration tests.
// Dependencies: control-check-tools, tiny_http
// ============================================================================

//! ## Overview
//! Spawns one-shot `tiny_http` servers on loopback and builds tool arguments.

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures may panic on setup failures."
)]

use std::collections::BTreeSet;
use std::thread;
use std::thread::JoinHandle;

use control_check_core::ToolArgs;
use control_check_tools::NetworkProbeConfig;
use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Converts a JSON object literal into tool arguments.
pub fn args(value: Value) -> ToolArgs {
    value.as_object().cloned().unwrap()
}

/// Probe configuration restricted to the loopback server.
pub fn local_probe_config() -> NetworkProbeConfig {
    NetworkProbeConfig {
        allow_http: true,
        allowed_hosts: Some(BTreeSet::from(["127.0.0.1".to_string()])),
        timeout_ms: 5_000,
        ..NetworkProbeConfig::default()
    }
}

/// Serves a single response and returns the base URL plus the server thread.
pub fn serve_once(status: u16, headers: &[(&str, &str)], body: &str) -> (String, JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let headers: Vec<Header> = headers
        .iter()
        .map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap())
        .collect();
    let body = body.to_string();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let mut response = Response::from_string(body).with_status_code(status);
            for header in headers {
                response.add_header(header);
            }
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}/"), handle)
}

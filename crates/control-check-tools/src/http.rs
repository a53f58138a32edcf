// crates/control-check-tools/src/http.rs
// ============================================================================
// Module: Network Probe Tool
// Description: Bounded HTTP(S) GET against the job target.
// Purpose: Capture status, headers, and a body sample as probe evidence.
// Dependencies: control-check-core, reqwest, serde
// ============================================================================

//! ## Overview
//! The network probe issues one GET request per step and records the status
//! code, the response headers, the first bytes of the body, and the elapsed
//! time. Redirects are never followed: a 3xx response is itself the
//! observation. Header names are lower-cased and repeated headers are joined
//! with `", "`. Timeouts, DNS failures, and refused connections are tool
//! errors and surface as failure payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;
use std::time::Instant;

use control_check_core::HttpObservation;
use control_check_core::Tool;
use control_check_core::ToolArgs;
use control_check_core::ToolError;
use control_check_core::ToolPayload;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use serde::Deserialize;

use crate::registry::required_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default number of body bytes kept in the sample.
const DEFAULT_BODY_SAMPLE_BYTES: usize = 512;
/// Upper bound for the configurable body sample.
pub const MAX_BODY_SAMPLE_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the network probe.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` URLs.
/// - If `allowed_hosts` is set, only listed hosts are probed.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkProbeConfig {
    /// Allow cleartext HTTP targets.
    #[serde(default = "default_allow_http")]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Number of body bytes kept in the sample.
    #[serde(default = "default_body_sample_bytes")]
    pub body_sample_bytes: usize,
    /// Optional host allowlist.
    #[serde(default)]
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkProbeConfig {
    fn default() -> Self {
        Self {
            allow_http: default_allow_http(),
            timeout_ms: default_timeout_ms(),
            body_sample_bytes: default_body_sample_bytes(),
            allowed_hosts: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Default for `allow_http`.
const fn default_allow_http() -> bool {
    true
}

/// Default for `timeout_ms`.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default for `body_sample_bytes`.
const fn default_body_sample_bytes() -> usize {
    DEFAULT_BODY_SAMPLE_BYTES
}

/// Default for `user_agent`.
fn default_user_agent() -> String {
    concat!("control-check/", env!("CARGO_PKG_VERSION")).to_string()
}

// ============================================================================
// SECTION: Tool Implementation
// ============================================================================

/// HTTP(S) probe tool.
///
/// # Invariants
/// - Redirects are not followed.
/// - At most `body_sample_bytes` of the body are read.
pub struct NetworkProbeTool {
    /// Probe configuration.
    config: NetworkProbeConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl NetworkProbeTool {
    /// Creates a probe with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Configuration`] when the HTTP client cannot be built.
    pub fn new(config: NetworkProbeConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| ToolError::Configuration("http client build failed".to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }
}

impl Tool for NetworkProbeTool {
    fn invoke(&self, args: &ToolArgs) -> Result<ToolPayload, ToolError> {
        let raw_url = required_str(args, "url")?;
        let url = Url::parse(raw_url.trim())
            .map_err(|err| ToolError::InvalidArgs(format!("invalid url: {err}")))?;
        validate_url(&url, &self.config)?;

        let started = Instant::now();
        let mut response = self.client.get(url.as_str()).send().map_err(classify_error)?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let sample = read_sample(&mut response, self.config.body_sample_bytes)?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(url = %url, status, elapsed_ms, "network probe completed");

        Ok(ToolPayload::HttpResponse(HttpObservation {
            url: raw_url.trim().to_string(),
            status,
            headers,
            body_sample: String::from_utf8_lossy(&sample).into_owned(),
            elapsed_ms,
        }))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates URL scheme and allowlist policy.
fn validate_url(url: &Url, config: &NetworkProbeConfig) -> Result<(), ToolError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        other => {
            return Err(ToolError::InvalidArgs(format!("unsupported url scheme: {other}")));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ToolError::InvalidArgs("url credentials are not allowed".to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| ToolError::InvalidArgs("url host required".to_string()))?;
    if let Some(allowlist) = &config.allowed_hosts {
        let host = normalize_host_label(host);
        if !allowlist.iter().any(|entry| normalize_host_label(entry) == host) {
            return Err(ToolError::InvalidArgs(format!("url host not allowed: {host}")));
        }
    }
    Ok(())
}

/// Normalizes host labels for allowlist comparisons.
fn normalize_host_label(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed =
        trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

/// Maps transport errors onto tool error kinds.
fn classify_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::Timeout(format!("http request: {err}"))
    } else if err.is_connect() {
        ToolError::Connection(format!("http request: {err}"))
    } else {
        ToolError::Execution(format!("http request: {err}"))
    }
}

/// Lower-cases header names and joins repeated values.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

/// Reads at most `limit` body bytes.
fn read_sample(response: &mut Response, limit: usize) -> Result<Vec<u8>, ToolError> {
    let limit = limit.min(MAX_BODY_SAMPLE_BYTES);
    let limit_u64 = u64::try_from(limit)
        .map_err(|_| ToolError::Configuration("body sample limit exceeds u64".to_string()))?;
    let mut buf = Vec::with_capacity(limit);
    response
        .take(limit_u64)
        .read_to_end(&mut buf)
        .map_err(|err| ToolError::Execution(format!("failed to read response body: {err}")))?;
    Ok(buf)
}

// crates/control-check-core/src/core/evidence.rs
// ============================================================================
// Module: Steps, Tool Results, and Evidence
// Description: Planned steps, tagged tool payloads, and content-addressed results.
// Purpose: Give every tool observation a canonical shape and digest.
// Dependencies: serde, serde_json, crate::core::hashing
// ============================================================================

//! ## Overview
//! The planner emits [`Step`]s, the tool registry turns each step into a
//! [`ToolResult`], and the orchestrator stores results as
//! [`ArtifactRecord`]s while feeding [`EvidenceItem`]s to the decision
//! engine. Payloads are a closed, tagged sum type so every consumer can
//! match on the observation kind instead of probing untyped maps.
//!
//! # Invariants
//! - `content_hash` is a pure function of `payload`: the SHA-256 of its RFC
//!   8785 canonical JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::hashing::ContentHash;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::JobId;
use crate::core::identifiers::ToolName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Tool arguments as a JSON object.
pub type ToolArgs = Map<String, Value>;

/// One planned tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Tool to invoke.
    pub tool: ToolName,
    /// Arguments passed to the tool.
    #[serde(default)]
    pub args: ToolArgs,
}

impl Step {
    /// Builds a step from a tool name and a single string argument.
    #[must_use]
    pub fn with_arg(tool: impl Into<ToolName>, key: &str, value: impl Into<String>) -> Self {
        let mut args = ToolArgs::new();
        args.insert(key.to_string(), Value::String(value.into()));
        Self {
            tool: tool.into(),
            args,
        }
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// HTTP response observed by the network probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpObservation {
    /// Requested URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    /// Leading bytes of the body, decoded lossily as UTF-8.
    pub body_sample: String,
    /// Wall time of the exchange in milliseconds.
    pub elapsed_ms: u64,
}

/// Output of a remote shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandObservation {
    /// Remote host the command targeted.
    pub host: String,
    /// Command string.
    pub command: String,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
    /// True when the command was simulated (dry-run).
    pub simulated: bool,
}

/// Rows returned by a read-only data query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryObservation {
    /// Query text.
    pub query: String,
    /// Column names.
    pub columns: Vec<String>,
    /// Row values in column order.
    pub rows: Vec<Vec<Value>>,
    /// Optional note (dry-run marker or truncation notice).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// True when the query was simulated (dry-run).
    pub simulated: bool,
}

/// Tool-level failure captured as evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    /// Error description.
    pub error: String,
}

/// Marker payload for a step naming an unregistered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownToolNote {
    /// Human-readable note naming the tool.
    pub note: String,
}

/// Tagged observation produced by a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolPayload {
    /// Network probe response.
    HttpResponse(HttpObservation),
    /// Remote command output.
    CommandOutput(CommandObservation),
    /// Data query rows.
    QueryRows(QueryObservation),
    /// Tool-level failure.
    Failure(ToolFailure),
    /// Unregistered tool name.
    UnknownTool(UnknownToolNote),
}

impl ToolPayload {
    /// Builds a failure payload.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(ToolFailure {
            error: error.into(),
        })
    }

    /// Builds the payload for an unregistered tool.
    #[must_use]
    pub fn unknown_tool(tool: &ToolName) -> Self {
        Self::UnknownTool(UnknownToolNote {
            note: format!("no such tool: {tool}"),
        })
    }

    /// Returns the HTTP observation when this is a network probe response.
    #[must_use]
    pub const fn as_http(&self) -> Option<&HttpObservation> {
        match self {
            Self::HttpResponse(observation) => Some(observation),
            _ => None,
        }
    }

    /// Returns true for failure payloads.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

// ============================================================================
// SECTION: Tool Results
// ============================================================================

/// Outcome of one tool invocation with its content digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that produced the payload.
    pub tool: ToolName,
    /// Arguments echoed from the step.
    pub args: ToolArgs,
    /// Tagged observation.
    pub payload: ToolPayload,
    /// Digest of the canonical payload.
    pub content_hash: ContentHash,
}

impl ToolResult {
    /// Hashes the payload and assembles a result.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the payload cannot be canonicalized.
    pub fn seal(tool: ToolName, args: ToolArgs, payload: ToolPayload) -> Result<Self, HashError> {
        let content_hash = payload_hash(&payload)?;
        Ok(Self {
            tool,
            args,
            payload,
            content_hash,
        })
    }

    /// Returns true when the stored digest matches the payload.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the payload cannot be canonicalized.
    pub fn verify(&self) -> Result<bool, HashError> {
        Ok(payload_hash(&self.payload)? == self.content_hash)
    }
}

/// Computes the content hash for a payload.
///
/// # Errors
///
/// Returns [`HashError`] when the payload cannot be canonicalized.
pub fn payload_hash(payload: &ToolPayload) -> Result<ContentHash, HashError> {
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, payload)
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Evidence handed to the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Tool that produced the payload.
    pub tool: ToolName,
    /// Tagged observation.
    pub payload: ToolPayload,
    /// Digest of the canonical payload.
    pub content_hash: ContentHash,
}

impl From<&ToolResult> for EvidenceItem {
    fn from(result: &ToolResult) -> Self {
        Self {
            tool: result.tool.clone(),
            payload: result.payload.clone(),
            content_hash: result.content_hash.clone(),
        }
    }
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Type tag for persisted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Serialized tool result.
    ToolResult,
}

impl ArtifactKind {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToolResult => "tool_result",
        }
    }
}

/// Persisted tool result for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Owning job.
    pub job_id: JobId,
    /// Execution order within the job (1-based).
    pub seq: u64,
    /// Artifact type tag.
    pub kind: ArtifactKind,
    /// Stored tool result.
    pub result: ToolResult,
    /// Time the artifact was recorded.
    pub recorded_at: Timestamp,
}

// crates/control-check-assist/src/collaborator.rs
// ============================================================================
// Module: Chat Collaborator
// Description: Generative planning and decisioning over a chat endpoint.
// Purpose: Implement the core collaborator traits with validated output.
// Dependencies: control-check-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Both calls send a fixed system prompt and a JSON user message at
//! temperature 0.
//! - `plan` sends `{"task":"plan","target",...,"controls",...}` with the tool
//!   definitions and maps each returned tool call to a [`Step`] in order.
//! - `decide` sends `{"task":"decide","controls",...,"evidence",...}` with a
//!   strict `json_schema` response format, validates the content against
//!   [`DecisionSchema`], and rejects evidence references that do not name a
//!   supplied evidence item.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use control_check_core::CollaboratorError;
use control_check_core::ContentHash;
use control_check_core::ControlId;
use control_check_core::ControlSet;
use control_check_core::Decision;
use control_check_core::DecisionCollaborator;
use control_check_core::DecisionItem;
use control_check_core::DecisionStatus;
use control_check_core::EvidenceItem;
use control_check_core::PlanningCollaborator;
use control_check_core::Step;
use control_check_core::ToolArgs;
use control_check_core::ToolName;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::client::ChatClient;
use crate::schema::DecisionSchema;
use crate::schema::decision_response_format;
use crate::schema::tool_definitions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// System prompt shared by planning and decisioning.
pub const SYSTEM_PROMPT: &str = "You are a security check operator. Plan tool calls using the \
                                 provided controls and supporting context. Use tools to collect \
                                 evidence before deciding. Output only valid structured JSON that \
                                 matches the schema, with no extra fields. If evidence is missing, \
                                 mark the control 'unknown' and propose next steps.";

// ============================================================================
// SECTION: Collaborator
// ============================================================================

/// Chat-backed planning and decision collaborator.
pub struct ChatCollaborator {
    /// Endpoint client.
    client: ChatClient,
    /// Compiled decision schema.
    schema: DecisionSchema,
}

impl ChatCollaborator {
    /// Wraps a client and compiles the decision schema.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::SchemaViolation`] when the decision schema
    /// does not compile.
    pub fn new(client: ChatClient) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client,
            schema: DecisionSchema::compile()?,
        })
    }

    /// Builds a request body with the system prompt and one user message.
    fn request(&self, user: &Value) -> Value {
        json!({
            "model": self.client.model(),
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user.to_string() }
            ]
        })
    }
}

impl PlanningCollaborator for ChatCollaborator {
    fn plan(&self, target: &str, controls: &ControlSet) -> Result<Vec<Step>, CollaboratorError> {
        let mut body = self.request(&json!({
            "task": "plan",
            "target": target,
            "controls": controls,
        }));
        body["tools"] = tool_definitions();
        body["tool_choice"] = Value::String("auto".to_string());
        let message = self.client.complete(&body)?;
        let steps = steps_from_message(&message)?;
        tracing::debug!(steps = steps.len(), "generative plan received");
        Ok(steps)
    }
}

impl DecisionCollaborator for ChatCollaborator {
    fn decide(
        &self,
        evidence: &[EvidenceItem],
        controls: &ControlSet,
    ) -> Result<Decision, CollaboratorError> {
        let mut body = self.request(&json!({
            "task": "decide",
            "controls": controls,
            "evidence": evidence,
        }));
        body["response_format"] = decision_response_format();
        let message = self.client.complete(&body)?;
        let output = decision_content(&message)?;
        self.schema.check(&output)?;
        let known: BTreeSet<&str> = evidence.iter().map(|item| item.content_hash.as_str()).collect();
        let items = decision_items(&output, &known)?;
        tracing::debug!(items = items.len(), "generative decision received");
        Ok(Decision::from_items(items))
    }
}

// ============================================================================
// SECTION: Response Parsing
// ============================================================================

/// Tool call as returned in `message.tool_calls`.
#[derive(Deserialize)]
struct ToolCall {
    /// Called function.
    function: FunctionCall,
}

/// Function name and JSON-encoded arguments.
#[derive(Deserialize)]
struct FunctionCall {
    /// Function name.
    name: String,
    /// Arguments encoded as a JSON string.
    arguments: String,
}

/// Decision item after schema validation.
#[derive(Deserialize)]
struct RawItem {
    /// Control identifier.
    control_id: String,
    /// Verdict.
    status: DecisionStatus,
    /// Evidence hashes.
    evidence_refs: Vec<String>,
    /// Observed finding.
    finding: String,
    /// Risk statement.
    risk: String,
    /// Remediation guidance.
    recommendation: String,
    /// Reproduction steps.
    repro: Vec<String>,
}

/// Maps `message.tool_calls` to steps, preserving order.
fn steps_from_message(message: &Value) -> Result<Vec<Step>, CollaboratorError> {
    let calls = match message.get("tool_calls") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(calls) => calls,
    };
    let calls: Vec<ToolCall> = serde_json::from_value(calls.clone())
        .map_err(|err| CollaboratorError::SchemaViolation(format!("tool_calls: {err}")))?;
    calls
        .into_iter()
        .map(|call| {
            let args = serde_json::from_str::<ToolArgs>(&call.function.arguments).map_err(|err| {
                CollaboratorError::SchemaViolation(format!(
                    "arguments for {} are not a json object: {err}",
                    call.function.name
                ))
            })?;
            Ok(Step {
                tool: ToolName::new(call.function.name),
                args,
            })
        })
        .collect()
}

/// Extracts and parses the JSON content of a decision message.
fn decision_content(message: &Value) -> Result<Value, CollaboratorError> {
    if let Some(refusal) = message.get("refusal").and_then(Value::as_str) {
        return Err(CollaboratorError::SchemaViolation(format!("model refused: {refusal}")));
    }
    let content = message.get("content").and_then(Value::as_str).ok_or_else(|| {
        CollaboratorError::SchemaViolation("decision message has no content".to_string())
    })?;
    serde_json::from_str(content)
        .map_err(|err| CollaboratorError::SchemaViolation(format!("decision content: {err}")))
}

/// Converts validated output into decision items.
fn decision_items(
    output: &Value,
    known: &BTreeSet<&str>,
) -> Result<Vec<DecisionItem>, CollaboratorError> {
    let raw_items = output.get("items").and_then(Value::as_array).ok_or_else(|| {
        CollaboratorError::SchemaViolation("decision output has no items".to_string())
    })?;
    raw_items
        .iter()
        .map(|raw| {
            let item: RawItem = serde_json::from_value(raw.clone())
                .map_err(|err| CollaboratorError::SchemaViolation(format!("decision item: {err}")))?;
            if let Some(unknown) =
                item.evidence_refs.iter().find(|reference| !known.contains(reference.as_str()))
            {
                return Err(CollaboratorError::SchemaViolation(format!(
                    "control {} references unknown evidence {unknown}",
                    item.control_id
                )));
            }
            Ok(DecisionItem {
                control_id: ControlId::new(item.control_id),
                status: item.status,
                evidence_refs: item.evidence_refs.into_iter().map(ContentHash::from_hex).collect(),
                finding: item.finding,
                risk: item.risk,
                recommendation: item.recommendation,
                repro: item.repro,
                raw: raw.clone(),
            })
        })
        .collect()
}

// crates/control-check-assist/src/schema.rs
// ============================================================================
// Module: Assist Schemas
// Description: Tool function definitions and the decision output schema.
// Purpose: Constrain what the chat model may request and return.
// Dependencies: control-check-core, jsonschema, serde_json
// ============================================================================

//! ## Overview
//! The tool definitions expose each built-in tool as a function taking one
//! string argument. The decision schema requires, per item, a control id, a
//! status enum, evidence references, a recommendation, and reproduction
//! steps. Every object is closed with `additionalProperties: false` and all
//! declared properties are required so the schema is accepted in strict mode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use control_check_core::CollaboratorError;
use control_check_core::DATA_QUERY_TOOL;
use control_check_core::NETWORK_PROBE_TOOL;
use control_check_core::REMOTE_COMMAND_TOOL;
use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name under which the decision schema is registered with the endpoint.
pub const DECISION_SCHEMA_NAME: &str = "control_decision";

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Returns the function definitions offered during planning.
#[must_use]
pub fn tool_definitions() -> Value {
    Value::Array(vec![
        function_definition(
            NETWORK_PROBE_TOOL,
            "HTTP(S) GET the URL and return status, headers, and a body sample.",
            "url",
        ),
        function_definition(
            REMOTE_COMMAND_TOOL,
            "Run a read-only shell command on the configured host.",
            "cmd",
        ),
        function_definition(DATA_QUERY_TOOL, "Run a read-only SQL query.", "sql"),
    ])
}

/// Builds a function definition with a single required string parameter.
fn function_definition(name: &str, description: &str, param: &str) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": { param: { "type": "string" } },
                "required": [param],
                "additionalProperties": false
            }
        }
    })
}

// ============================================================================
// SECTION: Decision Schema
// ============================================================================

/// Returns the JSON schema for decision output.
#[must_use]
pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "control_id": { "type": "string", "minLength": 1 },
                        "status": {
                            "type": "string",
                            "enum": ["pass", "partial", "fail", "unknown"]
                        },
                        "evidence_refs": { "type": "array", "items": { "type": "string" } },
                        "finding": { "type": "string" },
                        "risk": { "type": "string" },
                        "recommendation": { "type": "string" },
                        "repro": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": [
                        "control_id",
                        "status",
                        "evidence_refs",
                        "finding",
                        "risk",
                        "recommendation",
                        "repro"
                    ],
                    "additionalProperties": false
                }
            },
            "summary": {
                "type": "object",
                "properties": {
                    "pass": { "type": "integer", "minimum": 0 },
                    "partial": { "type": "integer", "minimum": 0 },
                    "fail": { "type": "integer", "minimum": 0 },
                    "unknown": { "type": "integer", "minimum": 0 }
                },
                "required": ["pass", "partial", "fail", "unknown"],
                "additionalProperties": false
            }
        },
        "required": ["items", "summary"],
        "additionalProperties": false
    })
}

/// Returns the `response_format` block requesting strict schema output.
#[must_use]
pub fn decision_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": DECISION_SCHEMA_NAME,
            "strict": true,
            "schema": decision_schema()
        }
    })
}

/// Compiled validator for decision output.
pub struct DecisionSchema {
    /// Draft 2020-12 validator.
    validator: Validator,
}

impl DecisionSchema {
    /// Compiles the decision schema.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::SchemaViolation`] when the schema does not
    /// compile.
    pub fn compile() -> Result<Self, CollaboratorError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&decision_schema())
            .map_err(|err| {
                CollaboratorError::SchemaViolation(format!("decision schema compile: {err}"))
            })?;
        Ok(Self {
            validator,
        })
    }

    /// Checks `output` against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::SchemaViolation`] naming the first error.
    pub fn check(&self, output: &Value) -> Result<(), CollaboratorError> {
        if self.validator.is_valid(output) {
            return Ok(());
        }
        let message = self
            .validator
            .iter_errors(output)
            .next()
            .map_or_else(|| "unknown validation error".to_string(), |err| err.to_string());
        Err(CollaboratorError::SchemaViolation(format!("decision output: {message}")))
    }
}

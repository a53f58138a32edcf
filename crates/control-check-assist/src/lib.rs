// crates/control-check-assist/src/lib.rs
// ============================================================================
// Module: Control Check Assist
// Description: Chat-completions backed planning and decision collaborators.
// Purpose: Provide the generative mode of the planner and decision engine.
// Dependencies: control-check-core, jsonschema, reqwest, serde_json
// ============================================================================

//! ## Overview
//! This crate talks to an OpenAI-compatible chat-completions endpoint.
//! [`ChatCollaborator`] implements both
//! [`control_check_core::PlanningCollaborator`] and
//! [`control_check_core::DecisionCollaborator`]:
//! - Planning offers the built-in tools as function definitions and turns the
//!   returned tool calls into ordered steps.
//! - Decisioning requests a strict JSON-schema response and validates it
//!   locally before any item reaches the engine.
//!
//! Invariants:
//! - The API credential is resolved per call; a missing credential is a
//!   [`control_check_core::CollaboratorError::MissingConfiguration`] and no
//!   request is sent.
//! - Output that does not match the expected shape is a schema violation and
//!   is never coerced.
//!
//! Security posture: model output is untrusted and validated before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod collaborator;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ChatClient;
pub use client::ChatConfig;
pub use collaborator::ChatCollaborator;
pub use schema::DecisionSchema;
pub use schema::decision_schema;
pub use schema::tool_definitions;

// crates/control-check-core/src/lib.rs
// ============================================================================
// Module: Control Check Core Library
// Description: Public API surface for the Control Check core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Control Check runs security-control checks against a target: it retrieves
//! control definitions, plans diagnostic tool calls, gathers content-hashed
//! evidence, and renders a pass/partial/fail/unknown verdict per control.
//! The core is backend-agnostic; tools, generative collaborators, and
//! durable stores plug in through [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AuditSink;
pub use interfaces::AuditStore;
pub use interfaces::Clock;
pub use interfaces::CollaboratorError;
pub use interfaces::ControlRetriever;
pub use interfaces::DecisionCollaborator;
pub use interfaces::JobStore;
pub use interfaces::PlanningCollaborator;
pub use interfaces::RetrievalError;
pub use interfaces::SnippetRanker;
pub use interfaces::StoreError;
pub use interfaces::Tool;
pub use interfaces::ToolError;
pub use interfaces::ToolInvocationError;
pub use interfaces::ToolInvoker;
pub use runtime::AuditFeed;
pub use runtime::AuditRecorder;
pub use runtime::CancellationToken;
pub use runtime::DecisionEngine;
pub use runtime::DecisionError;
pub use runtime::EvidenceLedger;
pub use runtime::FileAuditSink;
pub use runtime::HeaderMergePolicy;
pub use runtime::InMemoryJobStore;
pub use runtime::JobOutcome;
pub use runtime::LogicalClock;
pub use runtime::NoopAuditSink;
pub use runtime::Pipeline;
pub use runtime::PipelineError;
pub use runtime::PlanError;
pub use runtime::Planner;
pub use runtime::StaticControlCatalog;
pub use runtime::StderrAuditSink;
pub use runtime::SystemClock;

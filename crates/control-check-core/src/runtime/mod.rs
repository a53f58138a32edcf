// crates/control-check-core/src/runtime/mod.rs
// ============================================================================
// Module: Control Check Runtime
// Description: Pipeline orchestrator, planner, decision engine, and helpers.
// Purpose: Execute check jobs against the core interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime wires the interfaces into the job pipeline. It ships the
//! deterministic pieces (fallback planner, rule-based decisions, static
//! catalog) and the in-memory store used by tests and one-shot runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod catalog;
pub mod clock;
pub mod decision;
pub mod feed;
pub mod ledger;
pub mod pipeline;
pub mod planner;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditRecorder;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use catalog::StaticControlCatalog;
pub use clock::LogicalClock;
pub use clock::SystemClock;
pub use decision::DecisionEngine;
pub use decision::DecisionError;
pub use decision::HeaderMergePolicy;
pub use decision::fallback_decision;
pub use decision::merge_headers;
pub use feed::AuditFeed;
pub use ledger::EvidenceLedger;
pub use pipeline::CancellationToken;
pub use pipeline::JobOutcome;
pub use pipeline::Pipeline;
pub use pipeline::PipelineError;
pub use planner::PlanError;
pub use planner::Planner;
pub use planner::fallback_plan;
pub use store::InMemoryJobStore;

// crates/control-check-core/src/core/mod.rs
// ============================================================================
// Module: Control Check Core Types
// Description: Canonical job, control, evidence, decision, and audit structures.
// Purpose: Provide stable, serializable types shared by every crate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for the records the pipeline
//! reads and writes. Stores, tools, collaborators, and the CLI all exchange
//! these types rather than ad-hoc JSON maps.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod control;
pub mod decision;
pub mod evidence;
pub mod hashing;
pub mod identifiers;
pub mod job;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEntry;
pub use audit::AuditEvent;
pub use audit::AuditLevel;
pub use audit::PipelineStage;
pub use control::ControlDefinition;
pub use control::ControlKind;
pub use control::ControlSet;
pub use control::SupportingSnippet;
pub use decision::Decision;
pub use decision::DecisionItem;
pub use decision::DecisionStatus;
pub use decision::DecisionSummary;
pub use decision::Finding;
pub use decision::JobReport;
pub use evidence::ArtifactKind;
pub use evidence::ArtifactRecord;
pub use evidence::CommandObservation;
pub use evidence::EvidenceItem;
pub use evidence::HttpObservation;
pub use evidence::QueryObservation;
pub use evidence::Step;
pub use evidence::ToolArgs;
pub use evidence::ToolFailure;
pub use evidence::ToolPayload;
pub use evidence::ToolResult;
pub use evidence::UnknownToolNote;
pub use hashing::ContentHash;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashError;
pub use identifiers::BUILTIN_TOOLS;
pub use identifiers::ControlId;
pub use identifiers::DATA_QUERY_TOOL;
pub use identifiers::JobId;
pub use identifiers::NETWORK_PROBE_TOOL;
pub use identifiers::REMOTE_COMMAND_TOOL;
pub use identifiers::ToolName;
pub use job::DEFAULT_DEPTH;
pub use job::Job;
pub use job::JobError;
pub use job::JobStatus;
pub use job::JobSubmission;
pub use job::PROGRESS_COMPLETE;
pub use job::PROGRESS_STARTED;
pub use job::SubmissionError;
pub use time::Timestamp;

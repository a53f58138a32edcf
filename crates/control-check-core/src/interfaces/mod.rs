// crates/control-check-core/src/interfaces/mod.rs
// ============================================================================
// Module: Control Check Interfaces
// Description: Backend-agnostic traits for tools, collaborators, and stores.
// Purpose: Define the contracts the pipeline depends on without binding to backends.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The pipeline is wired entirely through these traits. Tools, retrieval,
//! generative collaborators, persistence, and audit sinks each live behind
//! an interface so hosts can swap backends and tests can supply fakes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AuditEntry;
use crate::core::AuditEvent;
use crate::core::ArtifactRecord;
use crate::core::ControlDefinition;
use crate::core::ControlId;
use crate::core::ControlSet;
use crate::core::Decision;
use crate::core::EvidenceItem;
use crate::core::Finding;
use crate::core::Job;
use crate::core::JobId;
use crate::core::Step;
use crate::core::SupportingSnippet;
use crate::core::Timestamp;
use crate::core::ToolArgs;
use crate::core::ToolName;
use crate::core::ToolPayload;
use crate::core::ToolResult;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of timestamps for job mutations and events.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Tool-level failures. These become failure payloads, never job failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Arguments were missing or malformed.
    #[error("invalid tool arguments: {0}")]
    InvalidArgs(String),
    /// Tool configuration is unusable.
    #[error("tool configuration error: {0}")]
    Configuration(String),
    /// Remote endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Operation exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Operation failed after connecting.
    #[error("execution failed: {0}")]
    Execution(String),
}

/// A single diagnostic capability (network probe, remote command, data query).
pub trait Tool: Send + Sync {
    /// Runs the tool with the step arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool cannot produce an observation.
    fn invoke(&self, args: &ToolArgs) -> Result<ToolPayload, ToolError>;
}

/// Unexpected failures while turning a step into a sealed result.
#[derive(Debug, Error)]
pub enum ToolInvocationError {
    /// The payload could not be canonicalized for hashing.
    #[error("tool result canonicalization failed: {0}")]
    Canonicalization(String),
}

/// Routes steps to tools and seals their payloads.
pub trait ToolInvoker {
    /// Invokes the tool named by the step.
    ///
    /// Unknown tools and tool-level failures are encoded in the payload.
    ///
    /// # Errors
    ///
    /// Returns [`ToolInvocationError`] only for unexpected failures.
    fn invoke(&self, step: &Step) -> Result<ToolResult, ToolInvocationError>;

    /// Returns true when a tool is registered under `name`.
    fn has_tool(&self, name: &ToolName) -> bool;
}

// ============================================================================
// SECTION: Retrieval
// ============================================================================

/// Errors raised by retrieval collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// Retrieval backend failed.
    #[error("control retrieval failed: {0}")]
    Backend(String),
}

/// Resolves control identifiers into definitions.
pub trait ControlRetriever {
    /// Returns the definition for `control_id`. Unknown ids yield an
    /// unclassified definition rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] when the backend fails.
    fn control_definition(&self, control_id: &ControlId)
    -> Result<ControlDefinition, RetrievalError>;
}

/// Similarity ranker over supporting documents.
pub trait SnippetRanker: Send + Sync {
    /// Returns the top `k` snippets for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] when ranking fails.
    fn rank(&self, query: &str, k: usize) -> Result<Vec<SupportingSnippet>, RetrievalError>;
}

// ============================================================================
// SECTION: Generative Collaborators
// ============================================================================

/// Errors raised by generative collaborators. All of them fail the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Required configuration (such as an API credential) is absent.
    #[error("collaborator configuration missing: {0}")]
    MissingConfiguration(String),
    /// The collaborator could not be reached.
    #[error("collaborator transport error: {0}")]
    Transport(String),
    /// The collaborator response violated the expected schema.
    #[error("collaborator schema violation: {0}")]
    SchemaViolation(String),
}

/// Generative planner.
pub trait PlanningCollaborator: Send + Sync {
    /// Proposes tool steps for the target and controls.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when planning fails or output is malformed.
    fn plan(&self, target: &str, controls: &ControlSet) -> Result<Vec<Step>, CollaboratorError>;
}

/// Generative decision maker.
pub trait DecisionCollaborator: Send + Sync {
    /// Produces a schema-conforming decision for the evidence.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when the decision fails or is malformed.
    fn decide(
        &self,
        evidence: &[EvidenceItem],
        controls: &ControlSet,
    ) -> Result<Decision, CollaboratorError>;
}

// ============================================================================
// SECTION: Stores
// ============================================================================

/// Job store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("job store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("job store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("job store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("job store invalid data: {0}")]
    Invalid(String),
    /// Referenced record does not exist.
    #[error("job store record not found: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("job store conflict: {0}")]
    Conflict(String),
    /// Store reported an error.
    #[error("job store error: {0}")]
    Store(String),
}

/// Persistence for jobs, artifacts, and findings.
pub trait JobStore {
    /// Inserts a new job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the job id already exists.
    fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Loads a job by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_job(&self, job_id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Replaces the stored status, progress, and timestamps of a job.
    ///
    /// The stored status must accept the new one
    /// ([`crate::core::JobStatus::accepts_update`]); terminal jobs are never
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job does not exist and
    /// [`StoreError::Conflict`] when the stored status rejects the update.
    fn update_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Atomically moves a queued job to the status carried by `job`.
    ///
    /// Exactly one caller can claim a given job; the check and the write
    /// happen under the same lock or transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job does not exist and
    /// [`StoreError::Conflict`] when the stored job is no longer `queued`.
    fn claim_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Lists jobs newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Appends an artifact for a job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError>;

    /// Lists artifacts of a job in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails or integrity checks fail.
    fn artifacts(&self, job_id: &JobId) -> Result<Vec<ArtifactRecord>, StoreError>;

    /// Persists all findings of a job in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when findings already exist for the job.
    fn save_findings(&self, job_id: &JobId, findings: &[Finding]) -> Result<(), StoreError>;

    /// Lists findings of a job in control order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn findings(&self, job_id: &JobId) -> Result<Vec<Finding>, StoreError>;
}

/// Append-only persistence for audit events.
pub trait AuditStore {
    /// Appends an event, assigning the next per-job sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append_event(&self, entry: AuditEntry) -> Result<AuditEvent, StoreError>;

    /// Returns events of a job with sequence numbers greater than `after_seq`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn events(&self, job_id: &JobId, after_seq: u64) -> Result<Vec<AuditEvent>, StoreError>;
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Observer notified of every appended audit event.
pub trait AuditSink: Send + Sync {
    /// Records an appended event.
    fn record(&self, event: &AuditEvent);
}

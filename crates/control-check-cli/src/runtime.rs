// crates/control-check-cli/src/runtime.rs
// ============================================================================
// Module: CLI Runtime Wiring
// Description: Builds the store, tools, engines, and pipeline from config.
// Purpose: Keep command handlers free of construction details.
// Dependencies: control-check-assist, control-check-config, control-check-core,
//               control-check-store-sqlite, control-check-tools, rand
// ============================================================================

//! ## Overview
//! [`StoreHandle`] dispatches to the configured backend so a single pipeline
//! type serves both the in-memory and the `SQLite` store. Generative mode
//! builds one [`ChatCollaborator`] shared by the planner and the decision
//! engine; fallback mode builds neither. Job identifiers are 128 random bits
//! rendered as lowercase hex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;
use std::sync::Arc;

use control_check_assist::ChatClient;
use control_check_assist::ChatCollaborator;
use control_check_config::AssistMode;
use control_check_config::AuditSinkType;
use control_check_config::ControlCheckConfig;
use control_check_core::ArtifactRecord;
use control_check_core::AuditEntry;
use control_check_core::AuditEvent;
use control_check_core::AuditSink;
use control_check_core::AuditStore;
use control_check_core::DecisionEngine;
use control_check_core::FileAuditSink;
use control_check_core::Finding;
use control_check_core::InMemoryJobStore;
use control_check_core::Job;
use control_check_core::JobId;
use control_check_core::JobStore;
use control_check_core::NoopAuditSink;
use control_check_core::Pipeline;
use control_check_core::Planner;
use control_check_core::StaticControlCatalog;
use control_check_core::StderrAuditSink;
use control_check_core::StoreError;
use control_check_core::SystemClock;
use control_check_store_sqlite::SqliteJobStore;
use control_check_tools::ToolRegistry;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::CliError;
use crate::CliResult;

// ============================================================================
// SECTION: Store Handle
// ============================================================================

/// Job store selected by configuration.
#[derive(Clone)]
pub(crate) enum StoreHandle {
    /// Process-local store; contents vanish when the command exits.
    Memory(InMemoryJobStore),
    /// Durable `SQLite` store shared across invocations.
    Sqlite(SqliteJobStore),
}

impl StoreHandle {
    /// Opens the configured backend.
    pub(crate) fn open(config: &ControlCheckConfig) -> CliResult<Self> {
        match config.store.sqlite_config() {
            None => Ok(Self::Memory(InMemoryJobStore::new())),
            Some(sqlite) => {
                let store = SqliteJobStore::new(sqlite)
                    .map_err(|err| CliError::new(format!("store open failed: {err}")))?;
                tracing::debug!(path = %store.path().display(), "sqlite store opened");
                Ok(Self::Sqlite(store))
            }
        }
    }
}

impl JobStore for StoreHandle {
    fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.insert_job(job),
            Self::Sqlite(store) => store.insert_job(job),
        }
    }

    fn load_job(&self, job_id: &JobId) -> Result<Option<Job>, StoreError> {
        match self {
            Self::Memory(store) => store.load_job(job_id),
            Self::Sqlite(store) => store.load_job(job_id),
        }
    }

    fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.update_job(job),
            Self::Sqlite(store) => store.update_job(job),
        }
    }

    fn claim_job(&self, job: &Job) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.claim_job(job),
            Self::Sqlite(store) => store.claim_job(job),
        }
    }

    fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        match self {
            Self::Memory(store) => store.list_jobs(limit),
            Self::Sqlite(store) => store.list_jobs(limit),
        }
    }

    fn append_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.append_artifact(artifact),
            Self::Sqlite(store) => store.append_artifact(artifact),
        }
    }

    fn artifacts(&self, job_id: &JobId) -> Result<Vec<ArtifactRecord>, StoreError> {
        match self {
            Self::Memory(store) => store.artifacts(job_id),
            Self::Sqlite(store) => store.artifacts(job_id),
        }
    }

    fn save_findings(&self, job_id: &JobId, findings: &[Finding]) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.save_findings(job_id, findings),
            Self::Sqlite(store) => store.save_findings(job_id, findings),
        }
    }

    fn findings(&self, job_id: &JobId) -> Result<Vec<Finding>, StoreError> {
        match self {
            Self::Memory(store) => store.findings(job_id),
            Self::Sqlite(store) => store.findings(job_id),
        }
    }
}

impl AuditStore for StoreHandle {
    fn append_event(&self, entry: AuditEntry) -> Result<AuditEvent, StoreError> {
        match self {
            Self::Memory(store) => store.append_event(entry),
            Self::Sqlite(store) => store.append_event(entry),
        }
    }

    fn events(&self, job_id: &JobId, after_seq: u64) -> Result<Vec<AuditEvent>, StoreError> {
        match self {
            Self::Memory(store) => store.events(job_id, after_seq),
            Self::Sqlite(store) => store.events(job_id, after_seq),
        }
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Pipeline type used by every CLI command.
pub(crate) type CliPipeline = Pipeline<StaticControlCatalog, ToolRegistry, StoreHandle>;

/// Builds the pipeline over `store` from configuration.
pub(crate) fn build_pipeline(
    config: &ControlCheckConfig,
    store: StoreHandle,
) -> CliResult<CliPipeline> {
    let tools = ToolRegistry::with_builtin_tools(config.tool_configs())
        .map_err(|err| CliError::new(format!("tool setup failed: {err}")))?;
    let (planner, decider) = build_engines(config)?;
    let sink = audit_sink(config)?;
    Ok(Pipeline::new(config.catalog(), tools, store, planner, decider, Arc::new(SystemClock))
        .with_audit_sink(sink))
}

/// Builds the planner and decision engine for the configured assist mode.
pub(crate) fn build_engines(config: &ControlCheckConfig) -> CliResult<(Planner, DecisionEngine)> {
    match config.assist.mode {
        AssistMode::Fallback => {
            Ok((Planner::fallback(), DecisionEngine::fallback(config.decision.header_merge)))
        }
        AssistMode::Generative => {
            let client = ChatClient::new(config.assist.chat.clone())
                .map_err(|err| CliError::new(format!("assist setup failed: {err}")))?;
            let collaborator = Arc::new(
                ChatCollaborator::new(client)
                    .map_err(|err| CliError::new(format!("assist setup failed: {err}")))?,
            );
            tracing::info!(model = %config.assist.chat.model, "generative assist enabled");
            Ok((
                Planner::generative(Arc::<ChatCollaborator>::clone(&collaborator)),
                DecisionEngine::generative(collaborator),
            ))
        }
    }
}

/// Builds the audit mirror sink.
fn audit_sink(config: &ControlCheckConfig) -> CliResult<Arc<dyn AuditSink>> {
    match (config.audit.sink_type, &config.audit.path) {
        (AuditSinkType::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkType::File, Some(path)) => {
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(format!("audit log {} unavailable: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
        (AuditSinkType::File, None) => {
            Err(CliError::new("file audit sink requires path".to_string()))
        }
        (AuditSinkType::None, _) => Ok(Arc::new(NoopAuditSink)),
    }
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Issues a fresh random job identifier.
pub(crate) fn new_job_id() -> JobId {
    let mut bytes = [0_u8; 16];
    OsRng.fill_bytes(&mut bytes);
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    JobId::new(hex)
}

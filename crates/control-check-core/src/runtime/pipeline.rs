// crates/control-check-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Check Pipeline Orchestrator
// Description: Per-job state machine driving retrieve, plan, execute, analyze, report.
// Purpose: Turn a queued job into persisted findings or a recorded failure.
// Dependencies: crate::{core, interfaces, runtime}, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`Pipeline`] is the single execution path for a job. It moves the job from
//! `queued` to `running`, announces each stage with a `stage` event, and
//! finishes in exactly one terminal state:
//! - `done`: every requested control has a persisted finding, progress is
//!   100, and the last event has level `done`;
//! - `failed`: no findings were persisted and the last event has level
//!   `error`.
//!
//! Individual step failures never fail a job. A tool-level error becomes a
//! failure payload; an unexpected error (or panic) inside a step is logged as
//! an `error` event and the step contributes no evidence. Errors raised by
//! retrieval, planning, analysis, cancellation, or the store fail the job.
//!
//! # Invariants
//! - A job is claimed through [`JobStore::claim_job`]; when two workers race
//!   for the same job, the loser fails before running any stage.
//! - Findings are written in one store call once analysis has succeeded,
//!   before the `report` stage is announced.
//! - The terminal event is the last event of the job.
//! - Progress only increases.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::json;
use thiserror::Error;

use crate::core::ArtifactKind;
use crate::core::ArtifactRecord;
use crate::core::AuditLevel;
use crate::core::ControlSet;
use crate::core::Finding;
use crate::core::Job;
use crate::core::JobError;
use crate::core::JobId;
use crate::core::JobStatus;
use crate::core::JobSubmission;
use crate::core::PROGRESS_COMPLETE;
use crate::core::PROGRESS_STARTED;
use crate::core::PipelineStage;
use crate::core::Step;
use crate::core::SubmissionError;
use crate::core::ToolResult;
use crate::interfaces::AuditSink;
use crate::interfaces::AuditStore;
use crate::interfaces::Clock;
use crate::interfaces::ControlRetriever;
use crate::interfaces::JobStore;
use crate::interfaces::RetrievalError;
use crate::interfaces::StoreError;
use crate::interfaces::ToolInvoker;
use crate::runtime::audit::AuditRecorder;
use crate::runtime::decision::DecisionEngine;
use crate::runtime::decision::DecisionError;
use crate::runtime::ledger::EvidenceLedger;
use crate::runtime::planner::PlanError;
use crate::runtime::planner::Planner;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Progress span shared by the execute stage.
const EXECUTE_PROGRESS_SPAN: usize = 80;
/// Progress reported once all steps have run.
const PROGRESS_EXECUTED: u8 = 90;

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative cancellation flag checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared flag.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Job identifier is unknown.
    #[error("job not found: {0}")]
    JobNotFound(String),
    /// Submission was rejected.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    /// Job status change was illegal.
    #[error(transparent)]
    Job(#[from] JobError),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Control retrieval failure.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    /// Planning failure.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Decision failure.
    #[error(transparent)]
    Decision(#[from] DecisionError),
    /// Cancellation was requested.
    #[error("job cancelled")]
    Cancelled,
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Terminal state of a processed job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Job record in its terminal state.
    pub job: Job,
    /// Persisted findings (empty when the job failed).
    pub findings: Vec<Finding>,
    /// Failure description when the job failed.
    pub error: Option<String>,
}

impl JobOutcome {
    /// Returns true when the job finished in `done`.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.job.status == JobStatus::Done
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Job orchestrator wired to retrieval, tools, and storage.
pub struct Pipeline<R, T, S> {
    /// Control retrieval collaborator.
    retriever: R,
    /// Tool registry.
    tools: T,
    /// Job, artifact, and finding store.
    store: S,
    /// Audit event recorder.
    audit: AuditRecorder<S>,
    /// Step planner.
    planner: Planner,
    /// Decision engine.
    decider: DecisionEngine,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
}

impl<R, T, S> Pipeline<R, T, S>
where
    R: ControlRetriever,
    T: ToolInvoker,
    S: JobStore + AuditStore + Clone,
{
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        retriever: R,
        tools: T,
        store: S,
        planner: Planner,
        decider: DecisionEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let audit = AuditRecorder::new(store.clone(), Arc::clone(&clock));
        Self {
            retriever,
            tools,
            store,
            audit,
            planner,
            decider,
            clock,
        }
    }

    /// Adds an audit sink notified of every event.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = self.audit.with_sink(sink);
        self
    }

    /// Returns the store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Validates a submission and stores the job as `queued`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when validation or the store fails.
    pub fn submit(&self, submission: JobSubmission, job_id: JobId) -> Result<Job, PipelineError> {
        let job = submission.into_job(job_id, self.clock.now())?;
        self.store.insert_job(&job)?;
        self.audit.record(
            &job.job_id,
            AuditLevel::Info,
            "job submitted",
            json!({"target": job.target, "controls": job.controls, "depth": job.depth}),
        )?;
        tracing::info!(job_id = %job.job_id, target = %job.target, "job queued");
        Ok(job)
    }

    /// Runs a queued job to a terminal state.
    ///
    /// Failures inside the stages are recorded on the job and returned as an
    /// outcome with status `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the job is missing, not queued, already
    /// claimed by another worker ([`StoreError::Conflict`]), or the store
    /// fails while recording the start or terminal state.
    pub fn run_job(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, PipelineError> {
        let mut job = self
            .store
            .load_job(job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
        let now = self.clock.now();
        job.transition(JobStatus::Running, now)?;
        job.advance_progress(PROGRESS_STARTED, now);
        self.store.claim_job(&job)?;
        self.stage(&job, PipelineStage::Prepare, json!({"target": job.target}))?;
        tracing::info!(job_id = %job.job_id, "job started");

        match self.execute(&mut job, cancel) {
            Ok(findings) => {
                let now = self.clock.now();
                job.advance_progress(PROGRESS_COMPLETE, now);
                job.transition(JobStatus::Done, now)?;
                self.store.update_job(&job)?;
                let ids: Vec<&str> = findings.iter().map(|f| f.item.control_id.as_str()).collect();
                self.audit.record_terminal(
                    &job.job_id,
                    AuditLevel::Done,
                    "job completed",
                    json!({"findings": ids}),
                )?;
                tracing::info!(job_id = %job.job_id, findings = findings.len(), "job completed");
                Ok(JobOutcome {
                    job,
                    findings,
                    error: None,
                })
            }
            Err(err) => {
                let message = err.to_string();
                job.transition(JobStatus::Failed, self.clock.now())?;
                self.store.update_job(&job)?;
                self.audit.record_terminal(
                    &job.job_id,
                    AuditLevel::Error,
                    "job failed",
                    json!({"error": message}),
                )?;
                tracing::warn!(job_id = %job.job_id, error = %message, "job failed");
                Ok(JobOutcome {
                    job,
                    findings: Vec::new(),
                    error: Some(message),
                })
            }
        }
    }

    /// Runs every stage and returns the persisted findings.
    fn execute(
        &self,
        job: &mut Job,
        cancel: &CancellationToken,
    ) -> Result<Vec<Finding>, PipelineError> {
        self.stage(job, PipelineStage::Retrieve, json!({"controls": job.controls}))?;
        let controls = self.retrieve(job)?;

        self.stage(job, PipelineStage::Plan, json!({"controls": controls.len()}))?;
        let steps = self.planner.plan(&job.target, &controls)?;
        if steps.is_empty() {
            self.audit.record(&job.job_id, AuditLevel::Warn, "no plan produced", json!({}))?;
        }

        self.stage(job, PipelineStage::Execute, json!({"steps": steps.len()}))?;
        let ledger = self.execute_steps(job, &steps, cancel)?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        self.stage(job, PipelineStage::Analyze, json!({"evidence": ledger.len()}))?;
        let decision = self.decider.decide(&ledger.all(), &controls)?;
        let findings: Vec<Finding> = decision
            .items
            .into_iter()
            .map(|item| Finding {
                job_id: job.job_id.clone(),
                item,
            })
            .collect();
        self.store.save_findings(&job.job_id, &findings)?;

        self.stage(job, PipelineStage::Report, json!({"summary": decision.summary}))?;
        Ok(findings)
    }

    /// Resolves the job's controls into an ordered control set.
    fn retrieve(&self, job: &Job) -> Result<ControlSet, PipelineError> {
        let mut controls = ControlSet::new();
        for control_id in &job.controls {
            controls.insert(self.retriever.control_definition(control_id)?);
        }
        Ok(controls)
    }

    /// Executes steps in order, absorbing per-step failures.
    fn execute_steps(
        &self,
        job: &mut Job,
        steps: &[Step],
        cancel: &CancellationToken,
    ) -> Result<EvidenceLedger, PipelineError> {
        let mut ledger = EvidenceLedger::new();
        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if !self.tools.has_tool(&step.tool) {
                self.audit.record(
                    &job.job_id,
                    AuditLevel::Warn,
                    "unknown tool",
                    json!({"tool": step.tool}),
                )?;
            }
            self.audit.record(
                &job.job_id,
                AuditLevel::Info,
                "tool_call",
                json!({"tool": step.tool, "args": step.args}),
            )?;
            match self.invoke_guarded(step) {
                Ok(result) => {
                    let artifact = ArtifactRecord {
                        job_id: job.job_id.clone(),
                        seq: u64::try_from(ledger.len() + 1).unwrap_or(u64::MAX),
                        kind: ArtifactKind::ToolResult,
                        result: result.clone(),
                        recorded_at: self.clock.now(),
                    };
                    self.store.append_artifact(&artifact)?;
                    self.audit.record(
                        &job.job_id,
                        AuditLevel::Info,
                        "tool_done",
                        json!({
                            "tool": result.tool,
                            "content_hash": result.content_hash,
                            "failed": result.payload.is_failure(),
                        }),
                    )?;
                    ledger.append(result);
                }
                Err(message) => {
                    tracing::warn!(job_id = %job.job_id, tool = %step.tool, error = %message, "step failed");
                    self.audit.record(
                        &job.job_id,
                        AuditLevel::Error,
                        "step_failed",
                        json!({"tool": step.tool, "error": message}),
                    )?;
                }
            }
            job.advance_progress(execute_progress(index + 1, total), self.clock.now());
            self.store.update_job(job)?;
        }
        job.advance_progress(PROGRESS_EXECUTED, self.clock.now());
        self.store.update_job(job)?;
        Ok(ledger)
    }

    /// Invokes a step, converting errors and panics into messages.
    fn invoke_guarded(&self, step: &Step) -> Result<ToolResult, String> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.tools.invoke(step))) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(err.to_string()),
            Err(panic) => Err(panic_message(panic.as_ref())),
        }
    }

    /// Records a stage entry event.
    fn stage(
        &self,
        job: &Job,
        stage: PipelineStage,
        payload: serde_json::Value,
    ) -> Result<(), PipelineError> {
        self.audit.record(&job.job_id, AuditLevel::Stage, stage.as_str(), payload)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the progress after `done` of `total` steps.
fn execute_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_STARTED;
    }
    let span = EXECUTE_PROGRESS_SPAN.saturating_mul(done.min(total)) / total;
    u8::try_from(usize::from(PROGRESS_STARTED).saturating_add(span)).unwrap_or(PROGRESS_EXECUTED)
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return format!("step panicked: {message}");
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return format!("step panicked: {message}");
    }
    "step panicked".to_string()
}

// crates/control-check-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Shared fakes for tools, collaborators, and evidence builders.
// Purpose: Keep integration tests focused on pipeline behavior.
// Dependencies: control-check-core, serde_json
// ============================================================================

//! ## Overview
//! Scripted tool invokers and collaborators plus builders for HTTP evidence.

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures may panic on setup failures."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use control_check_core::CollaboratorError;
use control_check_core::ControlSet;
use control_check_core::Decision;
use control_check_core::DecisionCollaborator;
use control_check_core::DecisionEngine;
use control_check_core::EvidenceItem;
use control_check_core::HeaderMergePolicy;
use control_check_core::HttpObservation;
use control_check_core::InMemoryJobStore;
use control_check_core::JobId;
use control_check_core::JobSubmission;
use control_check_core::LogicalClock;
use control_check_core::Pipeline;
use control_check_core::Planner;
use control_check_core::PlanningCollaborator;
use control_check_core::StaticControlCatalog;
use control_check_core::Step;
use control_check_core::ToolInvocationError;
use control_check_core::ToolInvoker;
use control_check_core::ToolName;
use control_check_core::ToolPayload;
use control_check_core::ToolResult;

// ============================================================================
// SECTION: Evidence Builders
// ============================================================================

/// Builds an HTTP observation with the given headers.
pub fn http_observation(url: &str, headers: &[(&str, &str)]) -> HttpObservation {
    HttpObservation {
        url: url.to_string(),
        status: 200,
        headers: headers
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect::<BTreeMap<_, _>>(),
        body_sample: "<html></html>".to_string(),
        elapsed_ms: 12,
    }
}

/// Builds a sealed evidence item for an HTTP observation.
pub fn http_evidence(url: &str, headers: &[(&str, &str)]) -> EvidenceItem {
    let result = ToolResult::seal(
        ToolName::new("network_probe"),
        serde_json::Map::new(),
        ToolPayload::HttpResponse(http_observation(url, headers)),
    )
    .unwrap();
    EvidenceItem::from(&result)
}

// ============================================================================
// SECTION: Scripted Tools
// ============================================================================

/// Behavior of a scripted tool.
#[derive(Clone)]
pub enum Script {
    /// Return the payload.
    Payload(ToolPayload),
    /// Fail with an unexpected invocation error.
    Unexpected(String),
    /// Panic inside the invocation.
    Panic(String),
}

/// Tool invoker returning scripted payloads by tool name.
#[derive(Clone, Default)]
pub struct ScriptedTools {
    /// Behaviors keyed by tool name.
    scripts: BTreeMap<String, Script>,
    /// Steps observed, in order.
    pub calls: Arc<Mutex<Vec<Step>>>,
}

impl ScriptedTools {
    /// Creates an invoker with no tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scripted behavior.
    pub fn with(mut self, tool: &str, script: Script) -> Self {
        self.scripts.insert(tool.to_string(), script);
        self
    }

    /// Returns the observed steps.
    pub fn observed(&self) -> Vec<Step> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolInvoker for ScriptedTools {
    fn invoke(&self, step: &Step) -> Result<ToolResult, ToolInvocationError> {
        self.calls.lock().unwrap().push(step.clone());
        let payload = match self.scripts.get(step.tool.as_str()) {
            None => ToolPayload::unknown_tool(&step.tool),
            Some(Script::Payload(payload)) => payload.clone(),
            Some(Script::Unexpected(message)) => {
                return Err(ToolInvocationError::Canonicalization(message.clone()));
            }
            Some(Script::Panic(message)) => panic!("{message}"),
        };
        ToolResult::seal(step.tool.clone(), step.args.clone(), payload)
            .map_err(|err| ToolInvocationError::Canonicalization(err.to_string()))
    }

    fn has_tool(&self, name: &ToolName) -> bool {
        self.scripts.contains_key(name.as_str())
    }
}

// ============================================================================
// SECTION: Scripted Collaborators
// ============================================================================

/// Planning collaborator returning a fixed result.
pub struct FixedPlanner(pub Result<Vec<Step>, CollaboratorError>);

impl PlanningCollaborator for FixedPlanner {
    fn plan(&self, _target: &str, _controls: &ControlSet) -> Result<Vec<Step>, CollaboratorError> {
        self.0.clone()
    }
}

/// Decision collaborator returning a fixed result.
pub struct FixedDecider(pub Result<Decision, CollaboratorError>);

impl DecisionCollaborator for FixedDecider {
    fn decide(
        &self,
        _evidence: &[EvidenceItem],
        _controls: &ControlSet,
    ) -> Result<Decision, CollaboratorError> {
        self.0.clone()
    }
}

// ============================================================================
// SECTION: Pipelines
// ============================================================================

/// Pipeline type used by the integration tests.
pub type TestPipeline = Pipeline<StaticControlCatalog, ScriptedTools, InMemoryJobStore>;

/// Builds a pipeline with fallback planning and decisions.
pub fn fallback_pipeline(tools: ScriptedTools) -> TestPipeline {
    pipeline_with(tools, Planner::fallback(), DecisionEngine::fallback(HeaderMergePolicy::LastWins))
}

/// Builds a pipeline with explicit planner and decision engine.
pub fn pipeline_with(tools: ScriptedTools, planner: Planner, decider: DecisionEngine) -> TestPipeline {
    Pipeline::new(
        StaticControlCatalog::builtin(),
        tools,
        InMemoryJobStore::new(),
        planner,
        decider,
        Arc::new(LogicalClock::new()),
    )
}

/// Builds a submission for `target` and `controls`.
pub fn submission(target: &str, controls: &[&str]) -> JobSubmission {
    JobSubmission {
        target: Some(target.to_string()),
        controls: controls.iter().map(|c| (*c).to_string()).collect(),
        depth: None,
        extra_patches: Vec::new(),
    }
}

/// Submits a job and returns its identifier.
pub fn submit(pipeline: &TestPipeline, target: &str, controls: &[&str]) -> JobId {
    let job_id = JobId::new("job-1");
    pipeline.submit(submission(target, controls), job_id.clone()).unwrap();
    job_id
}

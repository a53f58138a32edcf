// crates/control-check-core/src/core/decision.rs
// ============================================================================
// Module: Decisions and Findings
// Description: Per-control verdicts, summaries, and persisted findings.
// Purpose: Define the structured output of the analyze stage.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The decision engine turns the evidence set into one [`DecisionItem`] per
//! control. The orchestrator persists each item as a [`Finding`] once the
//! whole decision is known, and [`JobReport`] bundles the findings of a
//! finished job for external renderers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::ContentHash;
use crate::core::identifiers::ControlId;
use crate::core::identifiers::JobId;
use crate::core::job::Job;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Verdict for one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Control satisfied.
    Pass,
    /// Control partially satisfied.
    Partial,
    /// Control violated.
    Fail,
    /// Verdict could not be reached.
    Unknown,
}

impl DecisionStatus {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Partial => "partial",
            Self::Fail => "fail",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================================
// SECTION: Decision Items
// ============================================================================

/// Verdict and guidance for one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionItem {
    /// Control identifier.
    pub control_id: ControlId,
    /// Verdict.
    pub status: DecisionStatus,
    /// Content hashes of the evidence the verdict relies on.
    #[serde(default)]
    pub evidence_refs: Vec<ContentHash>,
    /// Observed finding.
    #[serde(default)]
    pub finding: String,
    /// Risk statement.
    #[serde(default)]
    pub risk: String,
    /// Remediation guidance.
    #[serde(default)]
    pub recommendation: String,
    /// Ordered reproduction steps.
    #[serde(default)]
    pub repro: Vec<String>,
    /// Raw decision payload as produced by the engine.
    #[serde(default)]
    pub raw: Value,
}

/// Count of verdicts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSummary {
    /// Passing controls.
    pub pass: usize,
    /// Partially satisfied controls.
    pub partial: usize,
    /// Failing controls.
    pub fail: usize,
    /// Controls without a verdict.
    pub unknown: usize,
}

impl DecisionSummary {
    /// Counts the statuses of the given items.
    #[must_use]
    pub fn from_statuses(statuses: impl IntoIterator<Item = DecisionStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            match status {
                DecisionStatus::Pass => summary.pass += 1,
                DecisionStatus::Partial => summary.partial += 1,
                DecisionStatus::Fail => summary.fail += 1,
                DecisionStatus::Unknown => summary.unknown += 1,
            }
        }
        summary
    }

    /// Returns the total number of counted verdicts.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pass + self.partial + self.fail + self.unknown
    }
}

/// Complete decision for one job.
///
/// # Invariants
/// - Exactly one item per distinct requested control.
/// - `summary.total()` equals `items.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Per-control verdicts in control order.
    pub items: Vec<DecisionItem>,
    /// Verdict counts.
    pub summary: DecisionSummary,
}

impl Decision {
    /// Builds a decision and derives its summary from the items.
    #[must_use]
    pub fn from_items(items: Vec<DecisionItem>) -> Self {
        let summary = DecisionSummary::from_statuses(items.iter().map(|item| item.status));
        Self {
            items,
            summary,
        }
    }
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Persisted verdict for one control of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Owning job.
    pub job_id: JobId,
    /// Verdict and guidance.
    #[serde(flatten)]
    pub item: DecisionItem,
}

/// Findings of a job bundled for report renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    /// Job record.
    pub job: Job,
    /// Persisted findings in control order.
    pub findings: Vec<Finding>,
    /// Verdict counts over the findings.
    pub summary: DecisionSummary,
}

impl JobReport {
    /// Builds a report from a job and its findings.
    #[must_use]
    pub fn new(job: Job, findings: Vec<Finding>) -> Self {
        let summary = DecisionSummary::from_statuses(findings.iter().map(|f| f.item.status));
        Self {
            job,
            findings,
            summary,
        }
    }
}

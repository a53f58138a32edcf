// crates/control-check-core/src/core/job.rs
// ============================================================================
// Module: Control Check Jobs
// Description: Job records, lifecycle status, and submission validation.
// Purpose: Encode the monotonic job state machine and progress rules.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A job is one request to check a target against a set of controls. Status
//! moves strictly forward along `queued -> running -> {done, failed}`; the
//! terminal states are absorbing. Progress is a percentage that never moves
//! backwards and never exceeds 100.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ControlId;
use crate::core::identifiers::JobId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Depth policy applied when a submission omits one.
pub const DEFAULT_DEPTH: &str = "safe";
/// Progress reported once a job starts running.
pub const PROGRESS_STARTED: u8 = 10;
/// Progress reported when a job completes.
pub const PROGRESS_COMPLETE: u8 = 100;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and waiting for a worker.
    Queued,
    /// Being executed by the orchestrator.
    Running,
    /// Completed with findings persisted.
    Done,
    /// Terminated by an error; no findings persisted.
    Failed,
}

impl JobStatus {
    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a persisted status label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true for absorbing states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true when `next` is a legal successor of this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running) | (Self::Running, Self::Done | Self::Failed)
        )
    }

    /// Returns true when a stored job in this status may be overwritten by a
    /// record in status `next`: a legal transition, or a progress update on a
    /// non-terminal job.
    #[must_use]
    pub const fn accepts_update(self, next: Self) -> bool {
        matches!((self, next), (Self::Queued, Self::Queued) | (Self::Running, Self::Running))
            || self.can_transition_to(next)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Job
// ============================================================================

/// Errors raised by illegal job mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The requested status change is not allowed.
    #[error("invalid job transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },
}

/// A request to check one target against a set of controls.
///
/// # Invariants
/// - `controls` is ordered and free of duplicates.
/// - `progress` is within `0..=100` and never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub job_id: JobId,
    /// Target URI or hostname.
    pub target: String,
    /// Controls to evaluate, in submission order.
    pub controls: Vec<ControlId>,
    /// Depth policy tag.
    pub depth: String,
    /// Opaque extra patches carried from submission.
    #[serde(default)]
    pub extra_patches: Vec<Value>,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Completion percentage.
    pub progress: u8,
    /// Submission time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl Job {
    /// Moves the job to `next`, rejecting backwards or skipped transitions.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] when the transition is illegal.
    pub fn transition(&mut self, next: JobStatus, at: Timestamp) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    /// Raises progress to `value`, clamped to 100. Lower values are ignored.
    pub fn advance_progress(&mut self, value: u8, at: Timestamp) {
        let value = value.min(PROGRESS_COMPLETE);
        if value > self.progress {
            self.progress = value;
            self.updated_at = at;
        }
    }
}

// ============================================================================
// SECTION: Submission
// ============================================================================

/// Errors raised when validating a job submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The target was missing or blank.
    #[error("target required")]
    MissingTarget,
}

/// Untrusted job request received from an outer surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Target URI or hostname.
    #[serde(default)]
    pub target: Option<String>,
    /// Requested control identifiers.
    #[serde(default)]
    pub controls: Vec<String>,
    /// Optional depth policy tag.
    #[serde(default)]
    pub depth: Option<String>,
    /// Opaque extra patches.
    #[serde(default)]
    pub extra_patches: Vec<Value>,
}

impl JobSubmission {
    /// Validates the submission and builds a queued job.
    ///
    /// Control identifiers are trimmed, blank entries are dropped, and
    /// duplicates (ignoring ASCII case) keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::MissingTarget`] when no usable target is given.
    pub fn into_job(self, job_id: JobId, now: Timestamp) -> Result<Job, SubmissionError> {
        let target = self
            .target
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SubmissionError::MissingTarget)?
            .to_string();
        let mut controls: Vec<ControlId> = Vec::with_capacity(self.controls.len());
        for raw in &self.controls {
            let trimmed = raw.trim();
            if trimmed.is_empty() || controls.iter().any(|existing| existing.matches(trimmed)) {
                continue;
            }
            controls.push(ControlId::new(trimmed));
        }
        let depth = self
            .depth
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_DEPTH)
            .to_string();
        Ok(Job {
            job_id,
            target,
            controls,
            depth,
            extra_patches: self.extra_patches,
            status: JobStatus::Queued,
            progress: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

// crates/control-check-core/src/core/audit.rs
// ============================================================================
// Module: Audit Events
// Description: Append-only job event records and pipeline stage labels.
// Purpose: Give progress consumers a durable, ordered narrative of each job.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every stage entry, tool call, warning, and terminal outcome of a job is
//! recorded as an [`AuditEvent`]. Sequence numbers are assigned by the store
//! on append and are strictly increasing per job. The last event of a job
//! carries the `terminal` marker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::JobId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Levels and Stages
// ============================================================================

/// Severity or kind of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Pipeline stage entry.
    Stage,
    /// Informational progress.
    Info,
    /// Recoverable anomaly.
    Warn,
    /// Step or job error.
    Error,
    /// Successful job completion.
    Done,
}

impl AuditLevel {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Done => "done",
        }
    }

    /// Parses a persisted label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "stage" => Some(Self::Stage),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Pipeline stages announced through stage events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Job picked up by a worker.
    Prepare,
    /// Control definitions retrieved.
    Retrieve,
    /// Steps planned.
    Plan,
    /// Steps executed.
    Execute,
    /// Evidence analyzed.
    Analyze,
    /// Findings finalized.
    Report,
}

impl PipelineStage {
    /// Returns the stable label used as the event message.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Retrieve => "retrieve",
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Analyze => "analyze",
            Self::Report => "report",
        }
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Event awaiting a sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Owning job.
    pub job_id: JobId,
    /// Event level.
    pub level: AuditLevel,
    /// Short message.
    pub message: String,
    /// Structured payload.
    pub payload: Value,
    /// Event time.
    pub timestamp: Timestamp,
    /// True for the job's final event (completion or failure).
    #[serde(default)]
    pub terminal: bool,
}

/// Appended job event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Owning job.
    pub job_id: JobId,
    /// Per-job sequence number, starting at 1.
    pub seq: u64,
    /// Event time.
    pub timestamp: Timestamp,
    /// Event level.
    pub level: AuditLevel,
    /// Short message.
    pub message: String,
    /// Structured payload.
    pub payload: Value,
    /// True for the job's final event; nothing is appended after it.
    #[serde(default)]
    pub terminal: bool,
}

impl AuditEvent {
    /// Assigns a sequence number to a pending entry.
    #[must_use]
    pub fn from_entry(entry: AuditEntry, seq: u64) -> Self {
        Self {
            job_id: entry.job_id,
            seq,
            timestamp: entry.timestamp,
            level: entry.level,
            message: entry.message,
            payload: entry.payload,
            terminal: entry.terminal,
        }
    }
}

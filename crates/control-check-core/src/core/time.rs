// crates/control-check-core/src/core/time.rs
// ============================================================================
// Module: Control Check Time Model
// Description: Caller-supplied timestamps for jobs, artifacts, and events.
// Purpose: Keep the runtime free of direct wall-clock reads.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Timestamps are supplied by a [`crate::interfaces::Clock`] owned by the
//! host. Production hosts use unix milliseconds; tests use logical ticks so
//! job histories are reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Timestamp attached to jobs, artifacts, and audit events.
///
/// # Invariants
/// - Values are explicitly provided by callers; the runtime never reads wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}

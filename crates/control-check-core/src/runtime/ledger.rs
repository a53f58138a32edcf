// crates/control-check-core/src/runtime/ledger.rs
// ============================================================================
// Module: Evidence Ledger
// Description: Ordered, in-memory accumulation of tool results for one job.
// Purpose: Hand the full evidence set to the decision engine in execution order.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The ledger lives for a single orchestrator pass. It never deduplicates:
//! two probes of the same URL are two evidence items, even when their
//! content hashes match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::EvidenceItem;
use crate::core::ToolResult;

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Append-only list of tool results for one job.
#[derive(Debug, Clone, Default)]
pub struct EvidenceLedger {
    /// Results in append order.
    results: Vec<ToolResult>,
}

impl EvidenceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Appends a result.
    pub fn append(&mut self, result: ToolResult) {
        self.results.push(result);
    }

    /// Returns evidence items in append order.
    #[must_use]
    pub fn all(&self) -> Vec<EvidenceItem> {
        self.results.iter().map(EvidenceItem::from).collect()
    }

    /// Returns the stored results.
    #[must_use]
    pub fn results(&self) -> &[ToolResult] {
        &self.results
    }

    /// Returns the number of results.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true when no results were appended.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

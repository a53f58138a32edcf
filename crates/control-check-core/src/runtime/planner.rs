// crates/control-check-core/src/runtime/planner.rs
// ============================================================================
// Module: Planner
// Description: Turns a target and control set into an ordered list of steps.
// Purpose: Choose between generative planning and deterministic keyword planning.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! The planner runs in one of two modes fixed at construction:
//! - generative: the [`PlanningCollaborator`] proposes steps and any error it
//!   raises (including missing credentials) fails the plan;
//! - fallback: each control whose check text mentions a web header marker
//!   contributes exactly one network probe of the job target.
//!
//! An empty plan is valid in both modes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::ControlDefinition;
use crate::core::ControlSet;
use crate::core::NETWORK_PROBE_TOOL;
use crate::core::Step;
use crate::interfaces::CollaboratorError;
use crate::interfaces::PlanningCollaborator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lower-case markers that make a control eligible for a network probe.
pub const PROBE_MARKERS: [&str; 6] = [
    "hsts",
    "strict-transport-security",
    "csp",
    "content-security-policy",
    "x-frame",
    "frame-ancestors",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Planning failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The generative collaborator failed.
    #[error("planning failed: {0}")]
    Collaborator(#[from] CollaboratorError),
}

// ============================================================================
// SECTION: Planner
// ============================================================================

/// Step planner with generative and fallback modes.
#[derive(Clone)]
pub struct Planner {
    /// Collaborator used in generative mode.
    collaborator: Option<Arc<dyn PlanningCollaborator>>,
}

impl Planner {
    /// Creates a planner that delegates to a generative collaborator.
    #[must_use]
    pub fn generative(collaborator: Arc<dyn PlanningCollaborator>) -> Self {
        Self {
            collaborator: Some(collaborator),
        }
    }

    /// Creates a planner that uses keyword matching only.
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            collaborator: None,
        }
    }

    /// Returns true when a generative collaborator is configured.
    #[must_use]
    pub const fn is_generative(&self) -> bool {
        self.collaborator.is_some()
    }

    /// Plans steps for the target and controls.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the generative collaborator fails.
    pub fn plan(&self, target: &str, controls: &ControlSet) -> Result<Vec<Step>, PlanError> {
        match &self.collaborator {
            Some(collaborator) => Ok(collaborator.plan(target, controls)?),
            None => Ok(fallback_plan(target, controls)),
        }
    }
}

// ============================================================================
// SECTION: Fallback Planning
// ============================================================================

/// Emits one network probe of `target` per control whose check text carries
/// a probe marker, in control order.
#[must_use]
pub fn fallback_plan(target: &str, controls: &ControlSet) -> Vec<Step> {
    controls
        .iter()
        .filter(|definition| wants_probe(definition))
        .map(|_| Step::with_arg(NETWORK_PROBE_TOOL, "url", target))
        .collect()
}

/// Returns true when the control's check text mentions a probe marker.
fn wants_probe(definition: &ControlDefinition) -> bool {
    let check = definition.check.to_lowercase();
    PROBE_MARKERS.iter().any(|marker| check.contains(marker))
}

// crates/control-check-core/src/core/control.rs
// ============================================================================
// Module: Control Definitions
// Description: Security control definitions and ordered control sets.
// Purpose: Describe what each control checks and how it is classified.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ControlDefinition`] is rebuilt for every job by the retrieval
//! collaborator. Its [`ControlKind`] tag selects the deterministic decision
//! rule; controls without a rule are [`ControlKind::Unclassified`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ControlId;

// ============================================================================
// SECTION: Control Kind
// ============================================================================

/// Classification of a control used to select decision rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Strict-Transport-Security must be present.
    TransportSecurity,
    /// Content-Security-Policy must be present.
    ContentSecurityPolicy,
    /// Framing must be restricted by X-Frame-Options or CSP frame-ancestors.
    FrameProtection,
    /// No deterministic rule exists.
    #[default]
    Unclassified,
}

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Ranked excerpt of supporting documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingSnippet {
    /// Source document name.
    pub source: String,
    /// Similarity score assigned by the ranker.
    pub score: f64,
    /// Bounded excerpt text.
    pub excerpt: String,
}

/// Definition of a single security control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDefinition {
    /// Control identifier.
    pub control_id: ControlId,
    /// Rule classification.
    #[serde(default)]
    pub kind: ControlKind,
    /// Human-readable title.
    pub title: String,
    /// Free-text description of what to check.
    pub check: String,
    /// Required standard.
    #[serde(default)]
    pub standard: String,
    /// Improvement guidance.
    #[serde(default)]
    pub improvement: String,
    /// Supporting snippets attached by the ranker.
    #[serde(default)]
    pub supporting: Vec<SupportingSnippet>,
}

impl ControlDefinition {
    /// Builds the definition used for identifiers no catalog knows about.
    #[must_use]
    pub fn unclassified(control_id: ControlId) -> Self {
        Self {
            title: control_id.as_str().to_string(),
            control_id,
            kind: ControlKind::Unclassified,
            check: "N/A".to_string(),
            standard: String::new(),
            improvement: String::new(),
            supporting: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Control Set
// ============================================================================

/// Ordered, de-duplicated set of control definitions for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlSet(Vec<ControlDefinition>);

impl ControlSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Inserts a definition unless its identifier is already present.
    ///
    /// Returns false when the identifier was a duplicate.
    pub fn insert(&mut self, definition: ControlDefinition) -> bool {
        if self.get(definition.control_id.as_str()).is_some() {
            return false;
        }
        self.0.push(definition);
        true
    }

    /// Looks up a definition by identifier, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, control_id: &str) -> Option<&ControlDefinition> {
        self.0.iter().find(|definition| definition.control_id.matches(control_id))
    }

    /// Iterates definitions in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ControlDefinition> {
        self.0.iter()
    }

    /// Returns the control identifiers in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ControlId> {
        self.0.iter().map(|definition| definition.control_id.clone()).collect()
    }

    /// Returns the number of controls.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no controls are present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ControlDefinition> for ControlSet {
    fn from_iter<I: IntoIterator<Item = ControlDefinition>>(iter: I) -> Self {
        let mut set = Self::new();
        for definition in iter {
            set.insert(definition);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ControlSet {
    type Item = &'a ControlDefinition;
    type IntoIter = std::slice::Iter<'a, ControlDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

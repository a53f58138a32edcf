// crates/control-check-core/src/runtime/decision.rs
// ============================================================================
// Module: Decision Engine
// Description: Evidence-to-verdict evaluation with generative and rule modes.
// Purpose: Produce exactly one decision item per requested control.
// Dependencies: crate::core, crate::interfaces, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! In generative mode the engine delegates to a [`DecisionCollaborator`] and
//! then checks coverage: the output must name every requested control once
//! and nothing else. The summary is always recomputed from the items.
//!
//! In fallback mode the engine applies fixed header rules to the merged
//! response headers of all network probe evidence:
//! - transport security passes when `strict-transport-security` is present;
//! - content security policy passes when `content-security-policy` is present;
//! - frame protection passes when `x-frame-options` is present or the CSP
//!   value contains a `frame-ancestors` directive.
//!
//! Rule controls without any network probe evidence and unclassified
//! controls resolve to `unknown`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::core::ContentHash;
use crate::core::ControlDefinition;
use crate::core::ControlKind;
use crate::core::ControlSet;
use crate::core::Decision;
use crate::core::DecisionItem;
use crate::core::DecisionStatus;
use crate::core::EvidenceItem;
use crate::core::HttpObservation;
use crate::interfaces::CollaboratorError;
use crate::interfaces::DecisionCollaborator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Transport security header name.
const HSTS_HEADER: &str = "strict-transport-security";
/// Content security policy header name.
const CSP_HEADER: &str = "content-security-policy";
/// Legacy frame options header name.
const XFO_HEADER: &str = "x-frame-options";
/// CSP directive restricting framing.
const FRAME_ANCESTORS: &str = "frame-ancestors";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Resolution of duplicate header names across multiple probe responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMergePolicy {
    /// The value from the latest probe wins.
    #[default]
    LastWins,
    /// The value from the earliest probe wins.
    FirstWins,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Decision failures. Any of these fails the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// The generative collaborator failed or returned invalid output.
    #[error("decision failed: {0}")]
    Collaborator(#[from] CollaboratorError),
    /// The decision did not cover the requested controls exactly once.
    #[error("decision coverage mismatch: {0}")]
    Coverage(String),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Decision engine with generative and fallback modes.
#[derive(Clone)]
pub struct DecisionEngine {
    /// Collaborator used in generative mode.
    collaborator: Option<Arc<dyn DecisionCollaborator>>,
    /// Header collision policy for fallback rules.
    merge_policy: HeaderMergePolicy,
}

impl DecisionEngine {
    /// Creates an engine that delegates to a generative collaborator.
    #[must_use]
    pub fn generative(collaborator: Arc<dyn DecisionCollaborator>) -> Self {
        Self {
            collaborator: Some(collaborator),
            merge_policy: HeaderMergePolicy::default(),
        }
    }

    /// Creates an engine that applies deterministic rules only.
    #[must_use]
    pub const fn fallback(merge_policy: HeaderMergePolicy) -> Self {
        Self {
            collaborator: None,
            merge_policy,
        }
    }

    /// Returns true when a generative collaborator is configured.
    #[must_use]
    pub const fn is_generative(&self) -> bool {
        self.collaborator.is_some()
    }

    /// Decides every control from the evidence set.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] when the collaborator fails or its output
    /// does not cover each requested control exactly once.
    pub fn decide(
        &self,
        evidence: &[EvidenceItem],
        controls: &ControlSet,
    ) -> Result<Decision, DecisionError> {
        match &self.collaborator {
            Some(collaborator) => {
                let decision = collaborator.decide(evidence, controls)?;
                align_to_controls(decision.items, controls)
            }
            None => Ok(fallback_decision(evidence, controls, self.merge_policy)),
        }
    }
}

// ============================================================================
// SECTION: Coverage
// ============================================================================

/// Reorders items into control order and rejects missing, repeated, or
/// unrequested controls.
fn align_to_controls(
    items: Vec<DecisionItem>,
    controls: &ControlSet,
) -> Result<Decision, DecisionError> {
    let mut slots: Vec<Option<DecisionItem>> = vec![None; controls.len()];
    for mut item in items {
        let Some(index) = controls
            .iter()
            .position(|definition| definition.control_id.matches(item.control_id.as_str()))
        else {
            return Err(DecisionError::Coverage(format!(
                "unrequested control in decision: {}",
                item.control_id
            )));
        };
        let Some(slot) = slots.get_mut(index) else {
            return Err(DecisionError::Coverage("control index out of range".to_string()));
        };
        if slot.is_some() {
            return Err(DecisionError::Coverage(format!(
                "control decided more than once: {}",
                item.control_id
            )));
        }
        if let Some(definition) = controls.iter().nth(index) {
            item.control_id = definition.control_id.clone();
        }
        *slot = Some(item);
    }
    let mut ordered = Vec::with_capacity(slots.len());
    for (slot, definition) in slots.into_iter().zip(controls.iter()) {
        let Some(item) = slot else {
            return Err(DecisionError::Coverage(format!(
                "control missing from decision: {}",
                definition.control_id
            )));
        };
        ordered.push(item);
    }
    Ok(Decision::from_items(ordered))
}

// ============================================================================
// SECTION: Fallback Rules
// ============================================================================

/// Fixed wording for one header rule.
struct RuleText {
    /// Header the rule inspects, used in the raw payload.
    header: &'static str,
    /// Finding when satisfied.
    present: &'static str,
    /// Finding when violated.
    missing: &'static str,
    /// Risk statement.
    risk: &'static str,
    /// Remediation guidance.
    recommendation: &'static str,
}

/// Returns the rule wording for a control kind, if a rule exists.
const fn rule_text(kind: ControlKind) -> Option<RuleText> {
    match kind {
        ControlKind::TransportSecurity => Some(RuleText {
            header: HSTS_HEADER,
            present: "HSTS present",
            missing: "HSTS missing",
            risk: "Downgrade/SSL stripping risk",
            recommendation: "Add HSTS header",
        }),
        ControlKind::ContentSecurityPolicy => Some(RuleText {
            header: CSP_HEADER,
            present: "CSP present",
            missing: "CSP missing",
            risk: "XSS/MiTM risk",
            recommendation: "Add CSP with strict directives",
        }),
        ControlKind::FrameProtection => Some(RuleText {
            header: XFO_HEADER,
            present: "Clickjacking protection present",
            missing: "No clickjacking protection",
            risk: "UI redress attack risk",
            recommendation: "Set CSP frame-ancestors or X-Frame-Options",
        }),
        ControlKind::Unclassified => None,
    }
}

/// Applies the deterministic header rules to every control.
///
/// The result depends only on the evidence and controls; evaluating the
/// same inputs twice yields identical decisions.
#[must_use]
pub fn fallback_decision(
    evidence: &[EvidenceItem],
    controls: &ControlSet,
    policy: HeaderMergePolicy,
) -> Decision {
    let probes: Vec<(&HttpObservation, &ContentHash)> = evidence
        .iter()
        .filter_map(|item| item.payload.as_http().map(|http| (http, &item.content_hash)))
        .collect();
    let headers = merge_headers(probes.iter().map(|(http, _)| *http), policy);
    let refs: Vec<ContentHash> = probes.iter().map(|(_, hash)| (*hash).clone()).collect();
    let repro_url = probes.first().map(|(http, _)| http.url.as_str());
    let items =
        controls.iter().map(|definition| decide_control(definition, &headers, &refs, repro_url));
    Decision::from_items(items.collect())
}

/// Merges probe headers case-insensitively under the collision policy.
#[must_use]
pub fn merge_headers<'a>(
    probes: impl Iterator<Item = &'a HttpObservation>,
    policy: HeaderMergePolicy,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for probe in probes {
        for (name, value) in &probe.headers {
            let name = name.to_ascii_lowercase();
            match policy {
                HeaderMergePolicy::LastWins => {
                    merged.insert(name, value.clone());
                }
                HeaderMergePolicy::FirstWins => {
                    merged.entry(name).or_insert_with(|| value.clone());
                }
            }
        }
    }
    merged
}

/// Decides one control against the merged headers.
fn decide_control(
    definition: &ControlDefinition,
    headers: &BTreeMap<String, String>,
    refs: &[ContentHash],
    repro_url: Option<&str>,
) -> DecisionItem {
    let Some(rule) = rule_text(definition.kind) else {
        return unknown_item(
            definition,
            "No rule",
            "Add a rule for this control",
            json!({"engine": "fallback", "rule": null}),
        );
    };
    let Some(url) = repro_url else {
        return unknown_item(
            definition,
            "No network probe evidence",
            "Re-run with a network probe of the target",
            json!({"engine": "fallback", "rule": definition.kind, "probes": 0}),
        );
    };
    let satisfied = match definition.kind {
        ControlKind::FrameProtection => {
            headers.contains_key(XFO_HEADER)
                || headers
                    .get(CSP_HEADER)
                    .is_some_and(|csp| csp.to_ascii_lowercase().contains(FRAME_ANCESTORS))
        }
        _ => headers.contains_key(rule.header),
    };
    let status = if satisfied { DecisionStatus::Pass } else { DecisionStatus::Fail };
    DecisionItem {
        control_id: definition.control_id.clone(),
        status,
        evidence_refs: refs.to_vec(),
        finding: if satisfied { rule.present } else { rule.missing }.to_string(),
        risk: rule.risk.to_string(),
        recommendation: rule.recommendation.to_string(),
        repro: vec![format!("curl -I {url}")],
        raw: json!({
            "engine": "fallback",
            "rule": definition.kind,
            "header": rule.header,
            "satisfied": satisfied,
            "probes": refs.len(),
        }),
    }
}

/// Builds an `unknown` item with empty references and no repro.
fn unknown_item(
    definition: &ControlDefinition,
    finding: &str,
    recommendation: &str,
    raw: serde_json::Value,
) -> DecisionItem {
    DecisionItem {
        control_id: definition.control_id.clone(),
        status: DecisionStatus::Unknown,
        evidence_refs: Vec::new(),
        finding: finding.to_string(),
        risk: String::new(),
        recommendation: recommendation.to_string(),
        repro: Vec::new(),
        raw,
    }
}

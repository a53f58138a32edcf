// crates/control-check-core/src/runtime/catalog.rs
// ============================================================================
// Module: Static Control Catalog
// Description: Built-in control definitions with optional snippet ranking.
// Purpose: Implement control retrieval without an external knowledge base.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The catalog ships definitions for the web header controls `U31`
//! (transport security), `U32` (content security policy) and `U33`
//! (clickjacking). Hosts may add or override definitions from configuration
//! and may attach a [`SnippetRanker`] that enriches each definition with
//! ranked supporting excerpts. Lookups ignore ASCII case; unknown
//! identifiers resolve to an unclassified definition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::ControlDefinition;
use crate::core::ControlId;
use crate::core::ControlKind;
use crate::interfaces::ControlRetriever;
use crate::interfaces::RetrievalError;
use crate::interfaces::SnippetRanker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of supporting snippets attached per control.
pub const DEFAULT_SNIPPET_LIMIT: usize = 3;
/// Maximum excerpt length in characters.
pub const MAX_EXCERPT_CHARS: usize = 600;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Control retriever backed by an in-memory definition list.
#[derive(Clone)]
pub struct StaticControlCatalog {
    /// Known definitions.
    definitions: Vec<ControlDefinition>,
    /// Optional supporting-document ranker.
    ranker: Option<Arc<dyn SnippetRanker>>,
    /// Snippets requested per control.
    snippet_limit: usize,
}

impl StaticControlCatalog {
    /// Creates a catalog with the built-in definitions.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            definitions: builtin_definitions(),
            ranker: None,
            snippet_limit: DEFAULT_SNIPPET_LIMIT,
        }
    }

    /// Adds definitions, replacing built-ins with the same identifier.
    #[must_use]
    pub fn with_definitions(mut self, extra: impl IntoIterator<Item = ControlDefinition>) -> Self {
        for definition in extra {
            self.definitions
                .retain(|existing| !existing.control_id.matches(definition.control_id.as_str()));
            self.definitions.push(definition);
        }
        self
    }

    /// Attaches a snippet ranker.
    #[must_use]
    pub fn with_ranker(mut self, ranker: Arc<dyn SnippetRanker>, limit: usize) -> Self {
        self.ranker = Some(ranker);
        self.snippet_limit = limit;
        self
    }

    /// Returns the known definitions.
    #[must_use]
    pub fn definitions(&self) -> &[ControlDefinition] {
        &self.definitions
    }
}

impl Default for StaticControlCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ControlRetriever for StaticControlCatalog {
    fn control_definition(
        &self,
        control_id: &ControlId,
    ) -> Result<ControlDefinition, RetrievalError> {
        let mut definition = self
            .definitions
            .iter()
            .find(|definition| definition.control_id.matches(control_id.as_str()))
            .cloned()
            .unwrap_or_else(|| ControlDefinition::unclassified(control_id.clone()));
        if let Some(ranker) = &self.ranker {
            let query = format!("{} {}", definition.title, definition.check);
            let mut snippets = ranker.rank(&query, self.snippet_limit)?;
            snippets.truncate(self.snippet_limit);
            for snippet in &mut snippets {
                snippet.excerpt = truncate_chars(&snippet.excerpt, MAX_EXCERPT_CHARS);
            }
            definition.supporting = snippets;
        }
        Ok(definition)
    }
}

// ============================================================================
// SECTION: Built-in Definitions
// ============================================================================

/// Returns the built-in control definitions.
fn builtin_definitions() -> Vec<ControlDefinition> {
    vec![
        definition(
            "U31",
            ControlKind::TransportSecurity,
            "U31: HSTS header required",
            "Make an HTTPS request and verify Strict-Transport-Security header exists.",
            "HSTS must be present for public endpoints (min 6 months).",
            "Enable HSTS on the web server config.",
        ),
        definition(
            "U32",
            ControlKind::ContentSecurityPolicy,
            "U32: Content-Security-Policy required",
            "Check response has Content-Security-Policy header with safe directives.",
            "CSP must restrict scripts/styles to trusted origins.",
            "Add CSP header; avoid unsafe-inline unless nonce/hash used.",
        ),
        definition(
            "U33",
            ControlKind::FrameProtection,
            "U33: Clickjacking protection",
            "Check frame-ancestors via CSP or X-Frame-Options set properly.",
            "Use CSP frame-ancestors 'none' or specific allowlist; XFO SAMEORIGIN optional.",
            "Prefer CSP frame-ancestors; remove ALLOW-FROM legacy.",
        ),
    ]
}

/// Builds a definition without supporting snippets.
fn definition(
    id: &str,
    kind: ControlKind,
    title: &str,
    check: &str,
    standard: &str,
    improvement: &str,
) -> ControlDefinition {
    ControlDefinition {
        control_id: ControlId::new(id),
        kind,
        title: title.to_string(),
        check: check.to_string(),
        standard: standard.to_string(),
        improvement: improvement.to_string(),
        supporting: Vec::new(),
    }
}

/// Truncates text to at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

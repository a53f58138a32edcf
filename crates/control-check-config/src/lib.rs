// crates/control-check-config/src/lib.rs
// ============================================================================
// Module: Control Check Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for control-check.toml semantics.
// Dependencies: control-check-core, control-check-tools, serde, toml
// ============================================================================

//! ## Overview
//! `control-check-config` defines the configuration model for Control Check.
//! It loads `control-check.toml`, applies defaults, and validates every
//! section fail-closed before any tool or store is constructed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;

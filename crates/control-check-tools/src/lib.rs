// crates/control-check-tools/src/lib.rs
// ============================================================================
// Module: Control Check Tools
// Description: Built-in diagnostic tools and the tool registry.
// Purpose: Turn planned steps into sealed, content-addressed tool results.
// Dependencies: control-check-core, reqwest, sqlx, tokio, serde
// ============================================================================

//! ## Overview
//! This crate ships the three built-in diagnostic tools (`network_probe`,
//! `remote_command`, `data_query`) and a registry that routes planned steps
//! to them by name. The registry implements
//! [`control_check_core::ToolInvoker`], so the pipeline never sees a tool
//! error: unknown tools and tool-level failures come back as payloads.
//! Invariants:
//! - Every result returned by [`ToolRegistry`] is sealed with its content hash.
//! - Remote command and data query tools never touch the network in dry-run
//!   mode.
//!
//! Security posture: tool outputs are untrusted evidence about the target.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod db;
pub mod http;
pub mod registry;
pub mod ssh;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use db::DataQueryConfig;
pub use db::DataQueryTool;
pub use http::NetworkProbeConfig;
pub use http::NetworkProbeTool;
pub use registry::BuiltinToolConfigs;
pub use registry::RegistryError;
pub use registry::ToolRegistry;
pub use ssh::RemoteCommandConfig;
pub use ssh::RemoteCommandTool;

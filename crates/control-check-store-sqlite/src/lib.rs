// crates/control-check-store-sqlite/src/lib.rs
// ============================================================================
// Module: Control Check SQLite Store
// Description: Durable job, artifact, finding, and event storage.
// Purpose: Persist pipeline state across processes.
// Dependencies: control-check-core, rusqlite
// ============================================================================

//! ## Overview
//! `SQLite`-backed implementation of the core [`control_check_core::JobStore`]
//! and [`control_check_core::AuditStore`] interfaces. A job submitted by one
//! process can be executed by a worker in another and inspected by a third.
//! Security posture: database contents are untrusted; artifact loads verify
//! stored hashes and fail closed on mismatch.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJobStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;

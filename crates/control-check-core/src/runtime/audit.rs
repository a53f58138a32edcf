// crates/control-check-core/src/runtime/audit.rs
// ============================================================================
// Module: Audit Recorder and Sinks
// Description: Appends job events to the store and mirrors them to sinks.
// Purpose: Give every job a durable, ordered event log plus live observers.
// Dependencies: crate::core, crate::interfaces, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`AuditRecorder`] is the only writer of audit events. It stamps each
//! entry with the host clock, appends it to the [`AuditStore`] (which assigns
//! the sequence number) and then fans the stored event out to every
//! registered [`AuditSink`]. Sinks are observers: a failing sink never fails
//! the job. JSON-lines sinks for stderr and files are provided here; the
//! push feed lives in [`crate::runtime::feed`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::core::AuditEntry;
use crate::core::AuditEvent;
use crate::core::AuditLevel;
use crate::core::JobId;
use crate::interfaces::AuditSink;
use crate::interfaces::AuditStore;
use crate::interfaces::Clock;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Appends audit events and notifies sinks.
#[derive(Clone)]
pub struct AuditRecorder<S> {
    /// Durable event store.
    store: S,
    /// Observers notified after each append.
    sinks: Vec<Arc<dyn AuditSink>>,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
}

impl<S: AuditStore> AuditRecorder<S> {
    /// Creates a recorder without sinks.
    #[must_use]
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sinks: Vec::new(),
            clock,
        }
    }

    /// Adds an observer sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Appends an event and notifies sinks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store rejects the append.
    pub fn record(
        &self,
        job_id: &JobId,
        level: AuditLevel,
        message: impl Into<String>,
        payload: Value,
    ) -> Result<AuditEvent, StoreError> {
        self.append(job_id, level, message.into(), payload, false)
    }

    /// Appends the final event of a job and notifies sinks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store rejects the append.
    pub fn record_terminal(
        &self,
        job_id: &JobId,
        level: AuditLevel,
        message: impl Into<String>,
        payload: Value,
    ) -> Result<AuditEvent, StoreError> {
        self.append(job_id, level, message.into(), payload, true)
    }

    /// Builds, stores, and fans out one event.
    fn append(
        &self,
        job_id: &JobId,
        level: AuditLevel,
        message: String,
        payload: Value,
        terminal: bool,
    ) -> Result<AuditEvent, StoreError> {
        let entry = AuditEntry {
            job_id: job_id.clone(),
            level,
            message,
            payload,
            timestamp: self.clock.now(),
            terminal,
        };
        let event = self.store.append_event(entry)?;
        tracing::debug!(
            job_id = %event.job_id,
            seq = event.seq,
            level = event.level.as_str(),
            message = %event.message,
            terminal = event.terminal,
            "audit event appended"
        );
        for sink in &self.sinks {
            sink.record(&event);
        }
        Ok(event)
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

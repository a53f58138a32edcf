// crates/control-check-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Job Store
// Description: Mutex-guarded job, artifact, finding, and event tables.
// Purpose: Provide a deterministic store for tests and single-process runs.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`JobStore`] and
//! [`AuditStore`]. All tables sit behind one mutex, so every call is atomic
//! and event sequence numbers are assigned without gaps. Status writes are
//! checked against the stored status under the same lock, so a job is claimed
//! at most once and terminal jobs are never rewritten. It is not durable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::ArtifactRecord;
use crate::core::AuditEntry;
use crate::core::AuditEvent;
use crate::core::Finding;
use crate::core::Job;
use crate::core::JobId;
use crate::core::JobStatus;
use crate::interfaces::AuditStore;
use crate::interfaces::JobStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Backing tables of the in-memory store.
#[derive(Debug, Default)]
struct Tables {
    /// Jobs keyed by identifier.
    jobs: BTreeMap<JobId, Job>,
    /// Job identifiers in insertion order.
    order: Vec<JobId>,
    /// Artifacts per job in execution order.
    artifacts: BTreeMap<JobId, Vec<ArtifactRecord>>,
    /// Findings per job.
    findings: BTreeMap<JobId, Vec<Finding>>,
    /// Events per job in sequence order.
    events: BTreeMap<JobId, Vec<AuditEvent>>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory job store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryJobStore {
    /// Tables protected by a mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables.
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Store("job store mutex poisoned".to_string()))
    }
}

impl JobStore for InMemoryJobStore {
    fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.jobs.contains_key(&job.job_id) {
            return Err(StoreError::Conflict(format!("job already exists: {}", job.job_id)));
        }
        tables.order.push(job.job_id.clone());
        tables.jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    fn load_job(&self, job_id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.jobs.get(job_id).cloned())
    }

    fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let Some(stored) = tables.jobs.get_mut(&job.job_id) else {
            return Err(StoreError::NotFound(format!("job not found: {}", job.job_id)));
        };
        if !stored.status.accepts_update(job.status) {
            return Err(status_conflict(job, stored.status));
        }
        apply_update(stored, job);
        Ok(())
    }

    fn claim_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let Some(stored) = tables.jobs.get_mut(&job.job_id) else {
            return Err(StoreError::NotFound(format!("job not found: {}", job.job_id)));
        };
        if stored.status != JobStatus::Queued || !stored.status.can_transition_to(job.status) {
            return Err(status_conflict(job, stored.status));
        }
        apply_update(stored, job);
        Ok(())
    }

    fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .order
            .iter()
            .rev()
            .filter_map(|job_id| tables.jobs.get(job_id).cloned())
            .take(limit)
            .collect())
    }

    fn append_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.jobs.contains_key(&artifact.job_id) {
            return Err(StoreError::NotFound(format!("job not found: {}", artifact.job_id)));
        }
        tables.artifacts.entry(artifact.job_id.clone()).or_default().push(artifact.clone());
        Ok(())
    }

    fn artifacts(&self, job_id: &JobId) -> Result<Vec<ArtifactRecord>, StoreError> {
        Ok(self.lock()?.artifacts.get(job_id).cloned().unwrap_or_default())
    }

    fn save_findings(&self, job_id: &JobId, findings: &[Finding]) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.jobs.contains_key(job_id) {
            return Err(StoreError::NotFound(format!("job not found: {job_id}")));
        }
        if tables.findings.contains_key(job_id) {
            return Err(StoreError::Conflict(format!("findings already saved: {job_id}")));
        }
        tables.findings.insert(job_id.clone(), findings.to_vec());
        Ok(())
    }

    fn findings(&self, job_id: &JobId) -> Result<Vec<Finding>, StoreError> {
        Ok(self.lock()?.findings.get(job_id).cloned().unwrap_or_default())
    }
}

impl AuditStore for InMemoryJobStore {
    fn append_event(&self, entry: AuditEntry) -> Result<AuditEvent, StoreError> {
        let mut tables = self.lock()?;
        let events = tables.events.entry(entry.job_id.clone()).or_default();
        let seq = events.last().map_or(1, |last| last.seq.saturating_add(1));
        let event = AuditEvent::from_entry(entry, seq);
        events.push(event.clone());
        Ok(event)
    }

    fn events(&self, job_id: &JobId, after_seq: u64) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self
            .lock()?
            .events
            .get(job_id)
            .map(|events| events.iter().filter(|event| event.seq > after_seq).cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Copies the mutable job fields onto the stored record.
fn apply_update(stored: &mut Job, job: &Job) {
    stored.status = job.status;
    stored.progress = job.progress;
    stored.updated_at = job.updated_at;
}

/// Builds the conflict reported when the stored status rejects a write.
fn status_conflict(job: &Job, stored: JobStatus) -> StoreError {
    StoreError::Conflict(format!("job {} is {stored}, cannot become {}", job.job_id, job.status))
}

// crates/control-check-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Job Store
// Description: Durable JobStore and AuditStore backed by SQLite WAL.
// Purpose: Persist jobs, artifacts, findings, and events across processes.
// Dependencies: control-check-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`JobStore`] and [`AuditStore`] on top of `SQLite`.
//! Jobs are stored as JSON documents next to an indexed status column.
//! Artifacts are stored as canonical JSON with a record hash; loads verify the
//! record hash and the embedded payload hash and fail closed on mismatch.
//! Event sequence numbers are assigned inside an immediate transaction, so
//! concurrent writers in separate processes never produce gaps or duplicates.
//! Job status writes are checked against the stored status in the same way,
//! so only one worker can claim a queued job.
//! Security posture: database contents are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use control_check_core::ArtifactRecord;
use control_check_core::AuditEntry;
use control_check_core::AuditEvent;
use control_check_core::AuditStore;
use control_check_core::DEFAULT_HASH_ALGORITHM;
use control_check_core::Finding;
use control_check_core::HashAlgorithm;
use control_check_core::Job;
use control_check_core::JobId;
use control_check_core::JobStatus;
use control_check_core::JobStore;
use control_check_core::StoreError;
use control_check_core::hashing::canonical_json_bytes;
use control_check_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// Write-ahead logging; readers never block the writer.
    #[default]
    Wal,
    /// Rollback journal deleted after each transaction.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` job store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages never embed raw payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Referenced job does not exist.
    #[error("sqlite store missing record: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
        }
    }
}

/// Maps engine errors onto [`SqliteStoreError::Db`].
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Returns true when the engine rejected a write for a constraint.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed job store with WAL support.
///
/// # Invariants
/// - Artifact loads verify stored hashes before returning records.
/// - Connection access is serialized through a mutex.
/// - Findings for a job are written exactly once.
#[derive(Clone)]
pub struct SqliteJobStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteJobStore {
    /// Opens or creates an `SQLite`-backed job store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when it carries an unsupported schema version.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        tracing::debug!(path = %config.path.display(), "sqlite job store opened");
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Verifies the store can execute a simple statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let connection = self.lock()?;
        connection.query_row("SELECT 1", [], |_| Ok(())).map_err(db_error)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Inserts a new job row.
    fn insert_job_row(&self, job: &Job) -> Result<(), SqliteStoreError> {
        let job_json = encode_json(job)?;
        let now = unix_millis();
        let connection = self.lock()?;
        let inserted = connection.execute(
            "INSERT INTO jobs (job_id, status, job_json, created_at_ms, updated_at_ms) VALUES \
             (?1, ?2, ?3, ?4, ?4)",
            params![job.job_id.as_str(), job.status.as_str(), job_json, now],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                Err(SqliteStoreError::Conflict(format!("job already exists: {}", job.job_id)))
            }
            Err(err) => Err(db_error(err)),
        }
    }

    /// Loads one job document.
    fn load_job_row(&self, job_id: &JobId) -> Result<Option<Job>, SqliteStoreError> {
        let connection = self.lock()?;
        let bytes: Option<Vec<u8>> = connection
            .query_row(
                "SELECT job_json FROM jobs WHERE job_id = ?1",
                params![job_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        bytes.map(|bytes| decode_job(job_id, &bytes)).transpose()
    }

    /// Applies status, progress, and update time to a stored job.
    ///
    /// With `claim` set the stored job must still be `queued`. The status
    /// check and the write share one immediate transaction, and the update is
    /// additionally guarded on the status that was read.
    fn update_job_row(&self, job: &Job, claim: bool) -> Result<(), SqliteStoreError> {
        let mut connection = self.lock()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        let Some(mut stored) = fetch_job(&tx, &job.job_id)? else {
            return Err(SqliteStoreError::NotFound(format!("job not found: {}", job.job_id)));
        };
        let expected = stored.status;
        let accepted = if claim {
            expected == JobStatus::Queued && expected.can_transition_to(job.status)
        } else {
            expected.accepts_update(job.status)
        };
        if !accepted {
            return Err(status_conflict(job, expected));
        }
        stored.status = job.status;
        stored.progress = job.progress;
        stored.updated_at = job.updated_at;
        let changed = tx
            .execute(
                "UPDATE jobs SET status = ?2, job_json = ?3, updated_at_ms = ?4 \
                 WHERE job_id = ?1 AND status = ?5",
                params![
                    stored.job_id.as_str(),
                    stored.status.as_str(),
                    encode_json(&stored)?,
                    unix_millis(),
                    expected.as_str()
                ],
            )
            .map_err(db_error)?;
        if changed != 1 {
            return Err(status_conflict(job, expected));
        }
        tx.commit().map_err(db_error)
    }

    /// Lists jobs newest first.
    fn list_job_rows(&self, limit: usize) -> Result<Vec<Job>, SqliteStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let connection = self.lock()?;
        let mut statement = connection
            .prepare("SELECT job_id, job_json FROM jobs ORDER BY ord DESC LIMIT ?1")
            .map_err(db_error)?;
        let rows = statement
            .query_map(params![limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(db_error)?;
        let mut jobs = Vec::new();
        for row in rows {
            let (job_id, bytes) = row.map_err(db_error)?;
            jobs.push(decode_job(&JobId::new(job_id), &bytes)?);
        }
        Ok(jobs)
    }

    /// Appends one artifact row.
    fn append_artifact_row(&self, artifact: &ArtifactRecord) -> Result<(), SqliteStoreError> {
        let record_json = canonical_json_bytes(artifact)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let record_hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &record_json);
        let seq = to_sql_seq(artifact.seq)?;
        let mut connection = self.lock()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        if !job_exists(&tx, &artifact.job_id)? {
            return Err(SqliteStoreError::NotFound(format!("job not found: {}", artifact.job_id)));
        }
        let inserted = tx.execute(
            "INSERT INTO artifacts (job_id, seq, kind, tool, content_hash, record_json, \
             record_hash, hash_algorithm, recorded_at_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, \
             ?9)",
            params![
                artifact.job_id.as_str(),
                seq,
                artifact.kind.as_str(),
                artifact.result.tool.as_str(),
                artifact.result.content_hash.as_str(),
                record_json,
                record_hash.as_str(),
                DEFAULT_HASH_ALGORITHM.label(),
                unix_millis(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(SqliteStoreError::Conflict(format!(
                    "artifact already recorded: {} seq {}",
                    artifact.job_id, artifact.seq
                )));
            }
            Err(err) => return Err(db_error(err)),
        }
        tx.commit().map_err(db_error)
    }

    /// Loads and verifies every artifact of a job in execution order.
    fn artifact_rows(&self, job_id: &JobId) -> Result<Vec<ArtifactRecord>, SqliteStoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT seq, content_hash, record_json, record_hash, hash_algorithm FROM \
                 artifacts WHERE job_id = ?1 ORDER BY seq ASC",
            )
            .map_err(db_error)?;
        let rows = statement
            .query_map(params![job_id.as_str()], |row| {
                Ok(StoredArtifact {
                    seq: row.get(0)?,
                    content_hash: row.get(1)?,
                    record_json: row.get(2)?,
                    record_hash: row.get(3)?,
                    hash_algorithm: row.get(4)?,
                })
            })
            .map_err(db_error)?;
        let mut records = Vec::new();
        for row in rows {
            let stored = row.map_err(db_error)?;
            records.push(verify_artifact(job_id, stored)?);
        }
        Ok(records)
    }

    /// Writes the findings of a job in one transaction.
    fn save_finding_rows(
        &self,
        job_id: &JobId,
        findings: &[Finding],
    ) -> Result<(), SqliteStoreError> {
        let mut connection = self.lock()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        if !job_exists(&tx, job_id)? {
            return Err(SqliteStoreError::NotFound(format!("job not found: {job_id}")));
        }
        let saved: Option<i64> = tx
            .query_row(
                "SELECT item_count FROM finding_sets WHERE job_id = ?1",
                params![job_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        if saved.is_some() {
            return Err(SqliteStoreError::Conflict(format!("findings already saved: {job_id}")));
        }
        let count = i64::try_from(findings.len())
            .map_err(|_| SqliteStoreError::Invalid("too many findings".to_string()))?;
        tx.execute(
            "INSERT INTO finding_sets (job_id, item_count, saved_at_ms) VALUES (?1, ?2, ?3)",
            params![job_id.as_str(), count, unix_millis()],
        )
        .map_err(db_error)?;
        for (position, finding) in (0_i64..).zip(findings) {
            tx.execute(
                "INSERT INTO findings (job_id, position, control_id, status, finding_json) VALUES \
                 (?1, ?2, ?3, ?4, ?5)",
                params![
                    job_id.as_str(),
                    position,
                    finding.item.control_id.as_str(),
                    finding.item.status.as_str(),
                    encode_json(finding)?,
                ],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)
    }

    /// Loads the findings of a job in control order.
    fn finding_rows(&self, job_id: &JobId) -> Result<Vec<Finding>, SqliteStoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare("SELECT finding_json FROM findings WHERE job_id = ?1 ORDER BY position ASC")
            .map_err(db_error)?;
        let rows = statement
            .query_map(params![job_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(db_error)?;
        let mut findings = Vec::new();
        for row in rows {
            let bytes = row.map_err(db_error)?;
            let finding: Finding = serde_json::from_slice(&bytes)
                .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            if finding.job_id != *job_id {
                return Err(SqliteStoreError::Invalid(
                    "job_id mismatch between key and finding".to_string(),
                ));
            }
            findings.push(finding);
        }
        Ok(findings)
    }

    /// Appends an event with the next per-job sequence number.
    fn append_event_row(&self, entry: AuditEntry) -> Result<AuditEvent, SqliteStoreError> {
        let mut connection = self.lock()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        let last: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM events WHERE job_id = ?1",
                params![entry.job_id.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        let last = u64::try_from(last)
            .map_err(|_| SqliteStoreError::Corrupt("negative event sequence".to_string()))?;
        let event = AuditEvent::from_entry(entry, last.saturating_add(1));
        tx.execute(
            "INSERT INTO events (job_id, seq, level, message, event_json, recorded_at_ms) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.job_id.as_str(),
                to_sql_seq(event.seq)?,
                event.level.as_str(),
                event.message,
                encode_json(&event)?,
                unix_millis(),
            ],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        Ok(event)
    }

    /// Loads events of a job with `seq > after_seq`.
    fn event_rows(
        &self,
        job_id: &JobId,
        after_seq: u64,
    ) -> Result<Vec<AuditEvent>, SqliteStoreError> {
        let Ok(after_seq) = i64::try_from(after_seq) else {
            return Ok(Vec::new());
        };
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT event_json FROM events WHERE job_id = ?1 AND seq > ?2 ORDER BY seq ASC",
            )
            .map_err(db_error)?;
        let rows = statement
            .query_map(params![job_id.as_str(), after_seq], |row| row.get::<_, Vec<u8>>(0))
            .map_err(db_error)?;
        let mut events = Vec::new();
        for row in rows {
            let bytes = row.map_err(db_error)?;
            let event: AuditEvent = serde_json::from_slice(&bytes)
                .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }
}

impl JobStore for SqliteJobStore {
    fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        self.insert_job_row(job).map_err(StoreError::from)
    }

    fn load_job(&self, job_id: &JobId) -> Result<Option<Job>, StoreError> {
        self.load_job_row(job_id).map_err(StoreError::from)
    }

    fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        self.update_job_row(job, false).map_err(StoreError::from)
    }

    fn claim_job(&self, job: &Job) -> Result<(), StoreError> {
        self.update_job_row(job, true).map_err(StoreError::from)
    }

    fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        self.list_job_rows(limit).map_err(StoreError::from)
    }

    fn append_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError> {
        self.append_artifact_row(artifact).map_err(StoreError::from)
    }

    fn artifacts(&self, job_id: &JobId) -> Result<Vec<ArtifactRecord>, StoreError> {
        self.artifact_rows(job_id).map_err(StoreError::from)
    }

    fn save_findings(&self, job_id: &JobId, findings: &[Finding]) -> Result<(), StoreError> {
        self.save_finding_rows(job_id, findings).map_err(StoreError::from)
    }

    fn findings(&self, job_id: &JobId) -> Result<Vec<Finding>, StoreError> {
        self.finding_rows(job_id).map_err(StoreError::from)
    }
}

impl AuditStore for SqliteJobStore {
    fn append_event(&self, entry: AuditEntry) -> Result<AuditEvent, StoreError> {
        self.append_event_row(entry).map_err(StoreError::from)
    }

    fn events(&self, job_id: &JobId, after_seq: u64) -> Result<Vec<AuditEvent>, StoreError> {
        self.event_rows(job_id, after_seq).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Helpers
// ============================================================================

/// Raw artifact row prior to verification.
struct StoredArtifact {
    /// Stored sequence number.
    seq: i64,
    /// Stored payload digest.
    content_hash: String,
    /// Canonical record bytes.
    record_json: Vec<u8>,
    /// Digest of `record_json`.
    record_hash: String,
    /// Algorithm label for `record_hash`.
    hash_algorithm: String,
}

/// Verifies both digests of a stored artifact and decodes it.
fn verify_artifact(
    job_id: &JobId,
    stored: StoredArtifact,
) -> Result<ArtifactRecord, SqliteStoreError> {
    let algorithm = parse_hash_algorithm(&stored.hash_algorithm)?;
    let expected = hash_bytes(algorithm, &stored.record_json);
    if expected.as_str() != stored.record_hash {
        tracing::warn!(job_id = %job_id, seq = stored.seq, "artifact record hash mismatch");
        return Err(SqliteStoreError::Corrupt(format!(
            "record hash mismatch for job {job_id} seq {}",
            stored.seq
        )));
    }
    let record: ArtifactRecord = serde_json::from_slice(&stored.record_json)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if record.job_id != *job_id || i64::try_from(record.seq).ok() != Some(stored.seq) {
        return Err(SqliteStoreError::Invalid(
            "job_id or seq mismatch between key and artifact".to_string(),
        ));
    }
    let payload_ok =
        record.result.verify().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if !payload_ok || record.result.content_hash.as_str() != stored.content_hash {
        tracing::warn!(job_id = %job_id, seq = stored.seq, "artifact payload hash mismatch");
        return Err(SqliteStoreError::Corrupt(format!(
            "payload hash mismatch for job {job_id} seq {}",
            stored.seq
        )));
    }
    Ok(record)
}

/// Loads one job document within a transaction.
fn fetch_job(tx: &Transaction<'_>, job_id: &JobId) -> Result<Option<Job>, SqliteStoreError> {
    let bytes: Option<Vec<u8>> = tx
        .query_row("SELECT job_json FROM jobs WHERE job_id = ?1", params![job_id.as_str()], |row| {
            row.get(0)
        })
        .optional()
        .map_err(db_error)?;
    bytes.map(|bytes| decode_job(job_id, &bytes)).transpose()
}

/// Builds the conflict reported when the stored status rejects a write.
fn status_conflict(job: &Job, stored: JobStatus) -> SqliteStoreError {
    SqliteStoreError::Conflict(format!(
        "job {} is {stored}, cannot become {}",
        job.job_id, job.status
    ))
}

/// Returns true when the job row exists.
fn job_exists(tx: &Transaction<'_>, job_id: &JobId) -> Result<bool, SqliteStoreError> {
    tx.query_row("SELECT 1 FROM jobs WHERE job_id = ?1", params![job_id.as_str()], |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
        .map_err(db_error)
}

/// Decodes a job document and checks it matches its key.
fn decode_job(job_id: &JobId, bytes: &[u8]) -> Result<Job, SqliteStoreError> {
    let job: Job =
        serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if job.job_id != *job_id {
        return Err(SqliteStoreError::Invalid("job_id mismatch between key and payload".to_string()));
    }
    Ok(job)
}

/// Serializes a value as JSON bytes.
fn encode_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SqliteStoreError> {
    serde_json::to_vec(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Converts a sequence number to an `SQLite` integer.
fn to_sql_seq(seq: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(seq).map_err(|_| SqliteStoreError::Invalid("sequence exceeds i64".to_string()))
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path
        .components()
        .any(|component| component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS jobs (
                    ord INTEGER PRIMARY KEY AUTOINCREMENT,
                    job_id TEXT NOT NULL UNIQUE,
                    status TEXT NOT NULL,
                    job_json BLOB NOT NULL,
                    created_at_ms INTEGER NOT NULL,
                    updated_at_ms INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);
                CREATE TABLE IF NOT EXISTS artifacts (
                    job_id TEXT NOT NULL,
                    seq INTEGER NOT NULL,
                    kind TEXT NOT NULL,
                    tool TEXT NOT NULL,
                    content_hash TEXT NOT NULL,
                    record_json BLOB NOT NULL,
                    record_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    recorded_at_ms INTEGER NOT NULL,
                    PRIMARY KEY (job_id, seq),
                    FOREIGN KEY (job_id) REFERENCES jobs(job_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS finding_sets (
                    job_id TEXT PRIMARY KEY,
                    item_count INTEGER NOT NULL,
                    saved_at_ms INTEGER NOT NULL,
                    FOREIGN KEY (job_id) REFERENCES jobs(job_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS findings (
                    job_id TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    control_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    finding_json BLOB NOT NULL,
                    PRIMARY KEY (job_id, position),
                    FOREIGN KEY (job_id) REFERENCES finding_sets(job_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS events (
                    job_id TEXT NOT NULL,
                    seq INTEGER NOT NULL,
                    level TEXT NOT NULL,
                    message TEXT NOT NULL,
                    event_json BLOB NOT NULL,
                    recorded_at_ms INTEGER NOT NULL,
                    PRIMARY KEY (job_id, seq)
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

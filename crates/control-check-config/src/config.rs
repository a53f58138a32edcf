// crates/control-check-config/src/config.rs
// ============================================================================
// Module: Control Check Configuration
// Description: Configuration loading and validation for Control Check.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: control-check-core, control-check-tools, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `CONTROL_CHECK_CONFIG`, then
//! `./control-check.toml`. Only the last one may be absent, in which case
//! defaults apply; a missing explicit path is an error. Every section is
//! validated before use and invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use control_check_assist::ChatConfig;
use control_check_core::ControlDefinition;
use control_check_core::HeaderMergePolicy;
use control_check_core::StaticControlCatalog;
use control_check_store_sqlite::SqliteStoreConfig;
use control_check_store_sqlite::SqliteStoreMode;
use control_check_store_sqlite::SqliteSyncMode;
use control_check_tools::BuiltinToolConfigs;
use control_check_tools::DataQueryConfig;
use control_check_tools::NetworkProbeConfig;
use control_check_tools::RemoteCommandConfig;
use control_check_tools::db::MAX_CONNECT_TIMEOUT_MS;
use control_check_tools::http::MAX_BODY_SAMPLE_BYTES;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "control-check.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CONTROL_CHECK_CONFIG";
/// Default `SQLite` database path.
pub const DEFAULT_STORE_PATH: &str = "control-check.db";
/// Default probe target.
pub const DEFAULT_TARGET: &str = "https://example.com";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of extra control definitions.
const MAX_CONTROLS: usize = 256;
/// Maximum generative collaborator timeout in milliseconds.
const MAX_ASSIST_TIMEOUT_MS: u64 = 300_000;
/// Maximum tool timeout in milliseconds.
const MAX_TOOL_TIMEOUT_MS: u64 = 600_000;
/// Maximum rows a data query may keep.
const MAX_QUERY_ROWS: usize = 100_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Top-level Control Check configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlCheckConfig {
    /// Simulate remote commands and data queries.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Target used when a submission omits one.
    #[serde(default = "default_target")]
    pub default_target: String,
    /// Generative collaborator settings.
    #[serde(default)]
    pub assist: AssistConfig,
    /// Built-in tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Job store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit mirror sink.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Decision engine settings.
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Extra control definitions; entries replace built-ins with the same id.
    #[serde(default)]
    pub controls: Vec<ControlDefinition>,
    /// File the configuration was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for ControlCheckConfig {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            default_target: default_target(),
            assist: AssistConfig::default(),
            tools: ToolsConfig::default(),
            store: StoreConfig::default(),
            audit: AuditConfig::default(),
            decision: DecisionConfig::default(),
            controls: Vec::new(),
            source: None,
        }
    }
}

/// Default for `dry_run`.
const fn default_dry_run() -> bool {
    true
}

/// Default for `default_target`.
fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

impl ControlCheckConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit file is missing, the file
    /// cannot be read or parsed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.default_target = self.default_target.trim().to_string();
        if self.default_target.is_empty() {
            return Err(ConfigError::Invalid("default_target must be non-empty".to_string()));
        }
        self.assist.validate()?;
        self.tools.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        validate_controls(&self.controls)?;
        Ok(())
    }

    /// Returns the built-in tool configuration bundle.
    #[must_use]
    pub fn tool_configs(&self) -> BuiltinToolConfigs {
        BuiltinToolConfigs {
            dry_run: self.dry_run,
            http: self.tools.http.clone(),
            ssh: self.tools.ssh.clone(),
            database: self.tools.database.clone(),
        }
    }

    /// Returns the control catalog with configured definitions applied.
    #[must_use]
    pub fn catalog(&self) -> StaticControlCatalog {
        StaticControlCatalog::builtin().with_definitions(self.controls.iter().cloned())
    }
}

// ============================================================================
// SECTION: Assist
// ============================================================================

/// Selects how plans and decisions are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssistMode {
    /// Deterministic local rules.
    #[default]
    Fallback,
    /// Chat-completions collaborator.
    Generative,
}

/// Generative collaborator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AssistConfig {
    /// Planning and decision mode.
    #[serde(default)]
    pub mode: AssistMode,
    /// Chat endpoint settings, used in generative mode.
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AssistConfig {
    /// Validates assist configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == AssistMode::Fallback {
            return Ok(());
        }
        let endpoint = self.chat.endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "assist.chat.endpoint must be an http(s) url".to_string(),
            ));
        }
        require_non_empty("assist.chat.model", &self.chat.model)?;
        require_non_empty("assist.chat.api_key_env", &self.chat.api_key_env)?;
        require_range("assist.chat.timeout_ms", self.chat.timeout_ms, 1, MAX_ASSIST_TIMEOUT_MS)
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Built-in tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct ToolsConfig {
    /// Network probe settings.
    #[serde(default)]
    pub http: NetworkProbeConfig,
    /// Remote command settings.
    #[serde(default)]
    pub ssh: RemoteCommandConfig,
    /// Data query settings.
    #[serde(default)]
    pub database: DataQueryConfig,
}

impl ToolsConfig {
    /// Validates tool configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let http = &self.http;
        require_range("tools.http.timeout_ms", http.timeout_ms, 1, MAX_TOOL_TIMEOUT_MS)?;
        if http.body_sample_bytes == 0 || http.body_sample_bytes > MAX_BODY_SAMPLE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "tools.http.body_sample_bytes must be between 1 and {MAX_BODY_SAMPLE_BYTES}"
            )));
        }
        require_non_empty("tools.http.user_agent", &http.user_agent)?;
        if let Some(hosts) = &http.allowed_hosts {
            if hosts.is_empty() {
                return Err(ConfigError::Invalid(
                    "tools.http.allowed_hosts must not be empty when set".to_string(),
                ));
            }
            for host in hosts {
                require_non_empty("tools.http.allowed_hosts entry", host)?;
            }
        }

        let ssh = &self.ssh;
        require_non_empty("tools.ssh.host", &ssh.host)?;
        require_non_empty("tools.ssh.user", &ssh.user)?;
        require_non_empty("tools.ssh.ssh_program", &ssh.ssh_program)?;
        require_port("tools.ssh.port", ssh.port)?;
        require_range(
            "tools.ssh.connect_timeout_ms",
            ssh.connect_timeout_ms,
            1,
            MAX_TOOL_TIMEOUT_MS,
        )?;
        require_range("tools.ssh.exec_timeout_ms", ssh.exec_timeout_ms, 1, MAX_TOOL_TIMEOUT_MS)?;
        if ssh.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "tools.ssh.max_output_bytes must be greater than zero".to_string(),
            ));
        }
        if let Some(identity) = &ssh.identity_file {
            validate_path_string("tools.ssh.identity_file", identity)?;
        }

        let database = &self.database;
        require_non_empty("tools.database.host", &database.host)?;
        require_non_empty("tools.database.user", &database.user)?;
        require_non_empty("tools.database.password_env", &database.password_env)?;
        require_port("tools.database.port", database.port)?;
        require_range(
            "tools.database.connect_timeout_ms",
            database.connect_timeout_ms,
            1,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        require_range(
            "tools.database.query_timeout_ms",
            database.query_timeout_ms,
            1,
            MAX_TOOL_TIMEOUT_MS,
        )?;
        if database.max_rows == 0 || database.max_rows > MAX_QUERY_ROWS {
            return Err(ConfigError::Invalid(format!(
                "tools.database.max_rows must be between 1 and {MAX_QUERY_ROWS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Job store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local in-memory store.
    Memory,
    /// `SQLite`-backed durable store.
    #[default]
    Sqlite,
}

/// Job store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path; defaults to `control-check.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Default for `busy_timeout_ms`.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StoreType::Memory => None,
            StoreType::Sqlite => Some(SqliteStoreConfig {
                path: self.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                if let Some(path) = &self.path {
                    validate_path_string("store.path", &path.to_string_lossy())?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit mirror sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkType {
    /// No mirror; events live in the store only.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit mirror configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(rename = "type", default)]
    pub sink_type: AuditSinkType,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink_type, &self.path) {
            (AuditSinkType::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (AuditSinkType::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Decision engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub struct DecisionConfig {
    /// Resolution of repeated header names across probes.
    #[serde(default)]
    pub header_merge: HeaderMergePolicy,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path and reports whether it was explicitly chosen.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if Path::new(trimmed)
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid(format!("{field} component too long")));
    }
    Ok(())
}

/// Rejects blank strings.
fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Rejects values outside `min..=max`.
fn require_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Rejects port zero.
fn require_port(field: &str, port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be non-zero")));
    }
    Ok(())
}

/// Validates extra control definitions.
fn validate_controls(controls: &[ControlDefinition]) -> Result<(), ConfigError> {
    if controls.len() > MAX_CONTROLS {
        return Err(ConfigError::Invalid(format!(
            "at most {MAX_CONTROLS} controls may be configured"
        )));
    }
    let mut seen = BTreeSet::new();
    for definition in controls {
        let id = definition.control_id.as_str().trim();
        if id.is_empty() {
            return Err(ConfigError::Invalid("controls.control_id must be non-empty".to_string()));
        }
        if !seen.insert(id.to_ascii_uppercase()) {
            return Err(ConfigError::Invalid(format!("duplicate control_id: {id}")));
        }
        require_non_empty("controls.title", &definition.title)?;
        require_non_empty("controls.check", &definition.check)?;
    }
    Ok(())
}

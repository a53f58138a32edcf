// crates/control-check-tools/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Name-to-handler routing for diagnostic tools.
// Purpose: Invoke tools by name and seal every payload with its content hash.
// Dependencies: control-check-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! The tool registry resolves planned steps by tool name and implements the
//! core [`ToolInvoker`] interface used by the pipeline. A step that names an
//! unregistered tool produces an `unknown_tool` payload, and a tool error
//! produces a `failure` payload; neither is an error. The only error path is
//! a payload that cannot be canonicalized for hashing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use control_check_core::BUILTIN_TOOLS;
use control_check_core::DATA_QUERY_TOOL;
use control_check_core::NETWORK_PROBE_TOOL;
use control_check_core::REMOTE_COMMAND_TOOL;
use control_check_core::Step;
use control_check_core::Tool;
use control_check_core::ToolArgs;
use control_check_core::ToolError;
use control_check_core::ToolInvocationError;
use control_check_core::ToolInvoker;
use control_check_core::ToolName;
use control_check_core::ToolPayload;
use control_check_core::ToolResult;
use serde_json::Value;
use thiserror::Error;

use crate::DataQueryConfig;
use crate::DataQueryTool;
use crate::NetworkProbeConfig;
use crate::NetworkProbeTool;
use crate::RemoteCommandConfig;
use crate::RemoteCommandTool;

// ============================================================================
// SECTION: Built-in Config
// ============================================================================

/// Configuration bundle for the built-in tools.
///
/// # Invariants
/// - `dry_run` applies to `remote_command` and `data_query`; network probes
///   always run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinToolConfigs {
    /// Simulate remote commands and data queries.
    pub dry_run: bool,
    /// Network probe configuration.
    pub http: NetworkProbeConfig,
    /// Remote command configuration.
    pub ssh: RemoteCommandConfig,
    /// Data query configuration.
    pub database: DataQueryConfig,
}

impl Default for BuiltinToolConfigs {
    fn default() -> Self {
        Self {
            dry_run: true,
            http: NetworkProbeConfig::default(),
            ssh: RemoteCommandConfig::default(),
            database: DataQueryConfig::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry setup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A tool name was registered twice.
    #[error("tool already registered: {0}")]
    DuplicateTool(String),
    /// Required tools are not registered.
    #[error("required tools not registered: {0}")]
    MissingTools(String),
    /// A built-in tool could not be initialized.
    #[error("tool initialization failed: {0}")]
    Initialization(String),
}

// ============================================================================
// SECTION: Tool Registry
// ============================================================================

/// Diagnostic tool registry.
///
/// # Invariants
/// - Tool names are unique within the registry.
/// - Registered tools are `Send + Sync` and stored behind trait objects.
#[derive(Default)]
pub struct ToolRegistry {
    /// Tool implementations keyed by name.
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the three built-in tools registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a tool cannot be initialized.
    pub fn with_builtin_tools(configs: BuiltinToolConfigs) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        let http = NetworkProbeTool::new(configs.http)
            .map_err(|err| RegistryError::Initialization(err.to_string()))?;
        registry.register(NETWORK_PROBE_TOOL, http)?;
        registry.register(
            REMOTE_COMMAND_TOOL,
            RemoteCommandTool::new(configs.ssh, configs.dry_run),
        )?;
        registry.register(DATA_QUERY_TOOL, DataQueryTool::new(configs.database, configs.dry_run))?;
        registry.require(BUILTIN_TOOLS)?;
        Ok(registry)
    }

    /// Registers a tool under the given name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] when the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        tool: impl Tool + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.tools.insert(name, Box::new(tool));
        Ok(())
    }

    /// Validates that every named tool is registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingTools`] listing the absent names.
    pub fn require<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), RegistryError> {
        let missing: Vec<&str> =
            names.into_iter().filter(|name| !self.tools.contains_key(*name)).collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(RegistryError::MissingTools(missing.join(", ")))
    }

    /// Returns registered tool names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

impl ToolInvoker for ToolRegistry {
    fn invoke(&self, step: &Step) -> Result<ToolResult, ToolInvocationError> {
        let payload = match self.tools.get(step.tool.as_str()) {
            None => {
                tracing::warn!(tool = %step.tool, "unknown tool requested");
                ToolPayload::unknown_tool(&step.tool)
            }
            Some(tool) => match tool.invoke(&step.args) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(tool = %step.tool, error = %err, "tool reported failure");
                    ToolPayload::failure(err.to_string())
                }
            },
        };
        ToolResult::seal(step.tool.clone(), step.args.clone(), payload)
            .map_err(|err| ToolInvocationError::Canonicalization(err.to_string()))
    }

    fn has_tool(&self, name: &ToolName) -> bool {
        self.tools.contains_key(name.as_str())
    }
}

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Extracts a required, non-blank string argument.
pub(crate) fn required_str<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.as_str()),
        Some(Value::String(_)) => Err(ToolError::InvalidArgs(format!("{key} must not be blank"))),
        Some(_) => Err(ToolError::InvalidArgs(format!("{key} must be a string"))),
        None => Err(ToolError::InvalidArgs(format!("missing {key} argument"))),
    }
}

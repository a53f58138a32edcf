// crates/control-check-assist/src/client.rs
// ============================================================================
// Module: Chat Client
// Description: Blocking client for an OpenAI-compatible chat endpoint.
// Purpose: Send one completion request and return the first message.
// Dependencies: control-check-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`ChatClient`] posts a request body to `{endpoint}/chat/completions` with
//! bearer authentication and returns `choices[0].message`. The client is
//! constructed explicitly and passed into the collaborator; there is no
//! process-wide handle.
//!
//! The credential comes either from an explicit key given at construction or
//! from the environment variable named by [`ChatConfig::api_key_env`], read on
//! every call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use control_check_core::CollaboratorError;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Chat endpoint settings.
///
/// # Invariants
/// - The API key is never stored in configuration; only the name of the
///   environment variable that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Default for `endpoint`.
fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Default for `model`.
fn default_model() -> String {
    "gpt-5-mini".to_string()
}

/// Default for `api_key_env`.
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default for `timeout_ms`.
const fn default_timeout_ms() -> u64 {
    60_000
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking chat-completions client.
pub struct ChatClient {
    /// Endpoint settings.
    config: ChatConfig,
    /// Explicit API key overriding the environment lookup.
    api_key: Option<String>,
    /// HTTP client used for requests.
    http: Client,
}

impl ChatClient {
    /// Creates a client that reads its key from the configured environment
    /// variable on each call.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(config: ChatConfig) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| CollaboratorError::Transport(format!("chat client build: {err}")))?;
        Ok(Self {
            config,
            api_key: None,
            http,
        })
    }

    /// Creates a client with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn with_api_key(
        config: ChatConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, CollaboratorError> {
        let mut client = Self::new(config)?;
        client.api_key = Some(api_key.into());
        Ok(client)
    }

    /// Returns the endpoint settings.
    #[must_use]
    pub const fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends `body` and returns `choices[0].message`.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::MissingConfiguration`] when no API key is
    /// available, [`CollaboratorError::Transport`] on network or HTTP status
    /// failures, and [`CollaboratorError::SchemaViolation`] when the response
    /// has no message.
    pub fn complete(&self, body: &Value) -> Result<Value, CollaboratorError> {
        let key = self.resolve_api_key()?;
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(body)
            .send()
            .map_err(|err| CollaboratorError::Transport(format!("chat request: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "chat endpoint returned HTTP {}",
                status.as_u16()
            )));
        }
        let payload: Value = response.json().map_err(|err| {
            if err.is_decode() {
                CollaboratorError::SchemaViolation(format!("chat response is not json: {err}"))
            } else {
                CollaboratorError::Transport(format!("chat response: {err}"))
            }
        })?;
        tracing::debug!(model = %self.config.model, "chat completion received");
        payload.pointer("/choices/0/message").cloned().ok_or_else(|| {
            CollaboratorError::SchemaViolation("chat response has no choices[0].message".to_string())
        })
    }

    /// Returns the explicit key or the non-empty value of the key variable.
    fn resolve_api_key(&self) -> Result<String, CollaboratorError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        match std::env::var(&self.config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(CollaboratorError::MissingConfiguration(format!(
                "{} is not set",
                self.config.api_key_env
            ))),
        }
    }
}

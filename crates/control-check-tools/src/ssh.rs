// crates/control-check-tools/src/ssh.rs
// ============================================================================
// Module: Remote Command Tool
// Description: Runs a shell command on the configured host over ssh.
// Purpose: Capture stdout, stderr, and exit code as command evidence.
// Dependencies: control-check-core, serde, std::process
// ============================================================================

//! ## Overview
//! In dry-run mode the tool returns a fixed simulated observation and never
//! touches the network. In live mode it spawns the system `ssh` client in
//! batch mode with trust-on-first-use host keys, bounded by a connect
//! timeout and an overall exec deadline. The child process is owned by a
//! guard that kills and reaps it on every exit path.
//!
//! Exit code 255 is reserved by `ssh` for its own failures and is reported as
//! a connection error; every other exit code is a normal observation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use control_check_core::CommandObservation;
use control_check_core::Tool;
use control_check_core::ToolArgs;
use control_check_core::ToolError;
use control_check_core::ToolPayload;
use serde::Deserialize;

use crate::registry::required_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed stdout returned in dry-run mode.
pub const DRY_RUN_STDOUT: &str = "DRY_RUN: no-op";
/// Exit code `ssh` uses for its own failures.
const SSH_FAILURE_EXIT_CODE: i32 = 255;
/// Interval between child status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the remote command tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCommandConfig {
    /// Remote host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Remote login user.
    #[serde(default = "default_user")]
    pub user: String,
    /// Remote ssh port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional private key file passed with `-i`.
    #[serde(default)]
    pub identity_file: Option<String>,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Overall deadline for the command in milliseconds.
    #[serde(default = "default_exec_timeout_ms")]
    pub exec_timeout_ms: u64,
    /// Maximum bytes captured from each of stdout and stderr.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// ssh client executable.
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,
}

impl Default for RemoteCommandConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            port: default_port(),
            identity_file: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            exec_timeout_ms: default_exec_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            ssh_program: default_ssh_program(),
        }
    }
}

/// Default for `host`.
fn default_host() -> String {
    "localhost".to_string()
}

/// Default for `user`.
fn default_user() -> String {
    "ubuntu".to_string()
}

/// Default for `port`.
const fn default_port() -> u16 {
    22
}

/// Default for `connect_timeout_ms`.
const fn default_connect_timeout_ms() -> u64 {
    8_000
}

/// Default for `exec_timeout_ms`.
const fn default_exec_timeout_ms() -> u64 {
    10_000
}

/// Default for `max_output_bytes`.
const fn default_max_output_bytes() -> usize {
    64 * 1024
}

/// Default for `ssh_program`.
fn default_ssh_program() -> String {
    "ssh".to_string()
}

// ============================================================================
// SECTION: Tool Implementation
// ============================================================================

/// Remote shell command tool.
pub struct RemoteCommandTool {
    /// Connection settings.
    config: RemoteCommandConfig,
    /// Simulate instead of connecting.
    dry_run: bool,
}

impl RemoteCommandTool {
    /// Creates the tool.
    #[must_use]
    pub const fn new(config: RemoteCommandConfig, dry_run: bool) -> Self {
        Self {
            config,
            dry_run,
        }
    }

    /// Runs the command through the ssh client.
    fn run_live(&self, command: &str) -> Result<CommandObservation, ToolError> {
        let mut child = Command::new(&self.config.ssh_program)
            .args(ssh_args(&self.config, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                ToolError::Configuration(format!(
                    "failed to spawn {}: {err}",
                    self.config.ssh_program
                ))
            })?;
        let stdout = child.stdout.take().map(|pipe| spawn_reader(pipe, self.config.max_output_bytes));
        let stderr = child.stderr.take().map(|pipe| spawn_reader(pipe, self.config.max_output_bytes));
        let mut guard = ChildGuard {
            child,
        };

        let deadline = Instant::now() + Duration::from_millis(self.config.exec_timeout_ms);
        let status = loop {
            if let Some(status) = guard
                .child
                .try_wait()
                .map_err(|err| ToolError::Execution(format!("ssh status unavailable: {err}")))?
            {
                break status;
            }
            if Instant::now() >= deadline {
                return Err(ToolError::Timeout(format!(
                    "remote command exceeded {} ms",
                    self.config.exec_timeout_ms
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };
        drop(guard);

        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);
        let Some(exit_code) = status.code() else {
            return Err(ToolError::Execution("ssh terminated by signal".to_string()));
        };
        if exit_code == SSH_FAILURE_EXIT_CODE {
            return Err(ToolError::Connection(format!(
                "ssh {}@{}: {}",
                self.config.user,
                self.config.host,
                stderr.trim()
            )));
        }
        tracing::debug!(host = %self.config.host, exit_code, "remote command completed");
        Ok(CommandObservation {
            host: self.config.host.clone(),
            command: command.to_string(),
            stdout,
            stderr,
            exit_code,
            simulated: false,
        })
    }
}

impl Tool for RemoteCommandTool {
    fn invoke(&self, args: &ToolArgs) -> Result<ToolPayload, ToolError> {
        let command = required_str(args, "cmd")?;
        if self.dry_run {
            return Ok(ToolPayload::CommandOutput(CommandObservation {
                host: self.config.host.clone(),
                command: command.to_string(),
                stdout: DRY_RUN_STDOUT.to_string(),
                stderr: String::new(),
                exit_code: 0,
                simulated: true,
            }));
        }
        self.run_live(command).map(ToolPayload::CommandOutput)
    }
}

// ============================================================================
// SECTION: Process Handling
// ============================================================================

/// Owns the ssh child and kills it unless it already exited.
struct ChildGuard {
    /// Child process handle.
    child: Child,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Builds the ssh argument list for `command`.
fn ssh_args(config: &RemoteCommandConfig, command: &str) -> Vec<String> {
    let connect_secs = config.connect_timeout_ms.div_ceil(1_000).max(1);
    let mut args = vec![
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={connect_secs}"),
        "-p".to_string(),
        config.port.to_string(),
    ];
    if let Some(identity) = &config.identity_file {
        args.push("-i".to_string());
        args.push(identity.clone());
    }
    args.push("--".to_string());
    args.push(format!("{}@{}", config.user, config.host));
    args.push(command.to_string());
    args
}

/// Drains a pipe on a thread, keeping at most `cap` bytes.
fn spawn_reader<R: Read + Send + 'static>(mut pipe: R, cap: usize) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut kept = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(read) => {
                    let room = cap.saturating_sub(kept.len());
                    kept.extend_from_slice(&chunk[..read.min(room)]);
                }
            }
        }
        String::from_utf8_lossy(&kept).into_owned()
    })
}

/// Collects a reader thread's output.
fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|handle| handle.join().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests;

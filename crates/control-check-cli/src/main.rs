// crates/control-check-cli/src/main.rs
// ============================================================================
// Module: Control Check CLI Entry Point
// Description: Command dispatcher for submitting, running, and inspecting jobs.
// Purpose: Drive the check pipeline from the shell with JSON output.
// Dependencies: clap, control-check-config, control-check-core, serde_jcs,
//               thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! The CLI loads `control-check.toml`, opens the configured store, and
//! dispatches one subcommand. Results are written to stdout as canonical JSON
//! (one document per line); diagnostics go to stderr through `tracing`.
//! `submit` and `work` split job creation from execution so a separate
//! process can run queued jobs against the same `SQLite` store, while `run`
//! does both in one invocation.
//!
//! Security posture: command-line and configuration inputs are untrusted and
//! validated before any tool runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod runtime;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use control_check_config::ControlCheckConfig;
use control_check_config::config_toml_example;
use control_check_core::AuditStore;
use control_check_core::CancellationToken;
use control_check_core::DecisionSummary;
use control_check_core::Finding;
use control_check_core::Job;
use control_check_core::JobId;
use control_check_core::JobOutcome;
use control_check_core::JobReport;
use control_check_core::JobStore;
use control_check_core::JobSubmission;
use control_check_core::PipelineError;
use control_check_core::StoreError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::runtime::StoreHandle;
use crate::runtime::build_pipeline;
use crate::runtime::new_job_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Control evaluated when a submission names none.
const DEFAULT_CONTROL: &str = "U31";
/// Default number of jobs listed by `jobs`.
const DEFAULT_JOB_LIMIT: usize = 50;
/// Default poll interval for `events --follow`.
const DEFAULT_POLL_MS: u64 = 500;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "control-check", version, disable_help_subcommand = true)]
struct Cli {
    /// Configuration file (overrides `CONTROL_CHECK_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Diagnostic verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a job and run it to completion.
    Run(SubmitArgs),
    /// Submit a job and leave it queued.
    Submit(SubmitArgs),
    /// Run a queued job.
    Work(JobArgs),
    /// List jobs, newest first.
    Jobs(JobsArgs),
    /// Show one job.
    Show(JobArgs),
    /// Print job events as JSON lines.
    Events(EventsArgs),
    /// Print the tool results recorded for a job.
    Artifacts(JobArgs),
    /// Print the job report with findings and summary.
    Report(JobArgs),
    /// List the control catalog.
    Controls,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Job submission arguments.
#[derive(Args, Debug)]
struct SubmitArgs {
    /// Target URL or host; defaults to `default_target` from config.
    #[arg(long, value_name = "TARGET")]
    target: Option<String>,
    /// Control identifiers (repeatable or comma separated).
    #[arg(long = "control", value_name = "ID", value_delimiter = ',')]
    controls: Vec<String>,
    /// Depth policy tag.
    #[arg(long, value_name = "DEPTH")]
    depth: Option<String>,
    /// Opaque JSON patch carried on the job (repeatable).
    #[arg(long = "extra-patch", value_name = "JSON")]
    extra_patches: Vec<String>,
}

/// Arguments naming a single job.
#[derive(Args, Debug)]
struct JobArgs {
    /// Job identifier.
    #[arg(value_name = "JOB_ID")]
    job_id: String,
}

/// Arguments for `jobs`.
#[derive(Args, Debug)]
struct JobsArgs {
    /// Maximum number of jobs to list.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_JOB_LIMIT)]
    limit: usize,
}

/// Arguments for `events`.
#[derive(Args, Debug)]
struct EventsArgs {
    /// Job identifier.
    #[arg(value_name = "JOB_ID")]
    job_id: String,
    /// Only print events with a sequence number above this cursor.
    #[arg(long, value_name = "SEQ", default_value_t = 0)]
    after: u64,
    /// Keep polling until the job reaches a terminal state.
    #[arg(long, action = ArgAction::SetTrue)]
    follow: bool,
    /// Poll interval in milliseconds for `--follow`.
    #[arg(long = "poll-ms", value_name = "MS", default_value_t = DEFAULT_POLL_MS)]
    poll_ms: u64,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration.
    Check,
    /// Print an annotated example configuration.
    Example,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// Result of `run` and `work`.
#[derive(Debug, Serialize)]
struct RunOutput {
    /// Job in its terminal state.
    job: Job,
    /// Persisted findings.
    findings: Vec<Finding>,
    /// Verdict counts.
    summary: DecisionSummary,
    /// Failure description when the job failed.
    error: Option<String>,
}

impl From<JobOutcome> for RunOutput {
    fn from(outcome: JobOutcome) -> Self {
        let summary =
            DecisionSummary::from_statuses(outcome.findings.iter().map(|f| f.item.status));
        Self {
            job: outcome.job,
            findings: outcome.findings,
            summary,
            error: outcome.error,
        }
    }
}

/// Result of `config check`.
#[derive(Debug, Serialize)]
struct ConfigCheckOutput {
    /// Validation verdict.
    status: &'static str,
    /// File the configuration came from, if any.
    source: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches the selected command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Commands::Config {
        command,
    } = &cli.command
    {
        return command_config(command, cli.config.as_deref());
    }
    let config = load_config(cli.config.as_deref())?;
    let store = StoreHandle::open(&config)?;
    dispatch(cli.command, &config, store)
}

/// Runs a command that needs configuration and a store.
fn dispatch(
    command: Commands,
    config: &ControlCheckConfig,
    store: StoreHandle,
) -> CliResult<ExitCode> {
    match command {
        Commands::Run(args) => command_run(args, config, store),
        Commands::Submit(args) => command_submit(args, config, store),
        Commands::Work(args) => command_work(&args, config, store),
        Commands::Jobs(args) => command_jobs(&args, &store),
        Commands::Show(args) => {
            let job = require_job(&store, &JobId::new(args.job_id))?;
            write_json(&job)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Events(args) => command_events(&args, &store),
        Commands::Artifacts(args) => {
            let job_id = JobId::new(args.job_id);
            require_job(&store, &job_id)?;
            let artifacts = store.artifacts(&job_id).map_err(store_error)?;
            write_json(&artifacts)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Report(args) => command_report(&args, &store),
        Commands::Controls => {
            let catalog = config.catalog();
            write_json(&catalog.definitions())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config {
            command,
        } => command_config(&command, config.source.as_deref()),
    }
}

/// Installs the stderr tracing subscriber.
///
/// Without `-v` the filter comes from `RUST_LOG`, defaulting to `warn`.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<ControlCheckConfig> {
    ControlCheckConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Job Commands
// ============================================================================

/// Executes the `run` command.
fn command_run(
    args: SubmitArgs,
    config: &ControlCheckConfig,
    store: StoreHandle,
) -> CliResult<ExitCode> {
    let submission = build_submission(args, config)?;
    let pipeline = build_pipeline(config, store)?;
    let job = pipeline.submit(submission, new_job_id()).map_err(pipeline_error)?;
    let outcome = pipeline.run_job(&job.job_id, &CancellationToken::new()).map_err(pipeline_error)?;
    emit_outcome(outcome)
}

/// Executes the `submit` command.
fn command_submit(
    args: SubmitArgs,
    config: &ControlCheckConfig,
    store: StoreHandle,
) -> CliResult<ExitCode> {
    let submission = build_submission(args, config)?;
    let pipeline = build_pipeline(config, store)?;
    let job = pipeline.submit(submission, new_job_id()).map_err(pipeline_error)?;
    write_json(&job)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `work` command.
fn command_work(
    args: &JobArgs,
    config: &ControlCheckConfig,
    store: StoreHandle,
) -> CliResult<ExitCode> {
    let pipeline = build_pipeline(config, store)?;
    let job_id = JobId::new(args.job_id.as_str());
    let outcome = pipeline.run_job(&job_id, &CancellationToken::new()).map_err(pipeline_error)?;
    emit_outcome(outcome)
}

/// Executes the `jobs` command.
fn command_jobs(args: &JobsArgs, store: &StoreHandle) -> CliResult<ExitCode> {
    let jobs = store.list_jobs(args.limit).map_err(store_error)?;
    write_json(&jobs)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `events` command.
///
/// With `--follow` the store is polled until the job is terminal and a poll
/// returns no new events.
fn command_events(args: &EventsArgs, store: &StoreHandle) -> CliResult<ExitCode> {
    let job_id = JobId::new(args.job_id.as_str());
    require_job(store, &job_id)?;
    let mut cursor = args.after;
    loop {
        let terminal = args.follow && require_job(store, &job_id)?.status.is_terminal();
        let events = store.events(&job_id, cursor).map_err(store_error)?;
        for event in &events {
            write_json(event)?;
            cursor = cursor.max(event.seq);
        }
        if !args.follow || (terminal && events.is_empty()) {
            break;
        }
        thread::sleep(Duration::from_millis(args.poll_ms));
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `report` command.
fn command_report(args: &JobArgs, store: &StoreHandle) -> CliResult<ExitCode> {
    let job_id = JobId::new(args.job_id.as_str());
    let job = require_job(store, &job_id)?;
    let findings = store.findings(&job_id).map_err(store_error)?;
    write_json(&JobReport::new(job, findings))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds a submission from arguments and configuration defaults.
fn build_submission(args: SubmitArgs, config: &ControlCheckConfig) -> CliResult<JobSubmission> {
    let controls = if args.controls.is_empty() {
        vec![DEFAULT_CONTROL.to_string()]
    } else {
        args.controls
    };
    let extra_patches = args
        .extra_patches
        .iter()
        .map(|raw| {
            serde_json::from_str::<Value>(raw)
                .map_err(|err| CliError::new(format!("invalid --extra-patch json: {err}")))
        })
        .collect::<CliResult<Vec<_>>>()?;
    Ok(JobSubmission {
        target: Some(args.target.unwrap_or_else(|| config.default_target.clone())),
        controls,
        depth: args.depth,
        extra_patches,
    })
}

/// Loads a job or reports it missing.
fn require_job(store: &StoreHandle, job_id: &JobId) -> CliResult<Job> {
    store
        .load_job(job_id)
        .map_err(store_error)?
        .ok_or_else(|| CliError::new(format!("job not found: {job_id}")))
}

/// Writes a run outcome and maps job failure to a failing exit code.
fn emit_outcome(outcome: JobOutcome) -> CliResult<ExitCode> {
    let succeeded = outcome.succeeded();
    write_json(&RunOutput::from(outcome))?;
    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes a `config` subcommand.
fn command_config(command: &ConfigCommand, path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check => {
            let config = load_config(path)?;
            write_json(&ConfigCheckOutput {
                status: "ok",
                source: config.source.as_ref().map(|source| source.display().to_string()),
            })?;
        }
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| output_error("stdout", &err))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value to stdout as one line of canonical JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("json encoding failed: {err}")))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| output_error("stdout", &err))
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write {stream}: {error}"))
}

/// Formats a store failure.
fn store_error(error: StoreError) -> CliError {
    CliError::new(format!("store error: {error}"))
}

/// Formats a pipeline failure.
fn pipeline_error(error: PipelineError) -> CliError {
    CliError::new(error.to_string())
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

//! Execution contexts for the blocking bulk fetch.
//!
//! The fetch either runs on a blocking thread of the current runtime
//! ([`ThreadBackend`]) or in a child process started from the CLI's hidden
//! `fetch` command ([`SubprocessBackend`]). Either way the supervisor gets a
//! join handle it can race against its monitor ticks.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::TransferError;
use super::fetch::{BulkFetch, FetchJob, FetchSummary};

/// Exit code of the `fetch` child for a registry or auth failure.
pub const FETCH_EXIT_REGISTRY: i32 = 3;

/// Exit code of the `fetch` child for any other failure.
pub const FETCH_EXIT_FAILURE: i32 = 1;

/// Lines of child stderr kept in the error detail.
const STDERR_TAIL_LINES: usize = 20;

/// Runs a [`FetchJob`] somewhere and reports its outcome.
///
/// Must be called from within a tokio runtime.
pub trait ExecutionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn launch(&self, job: FetchJob) -> JoinHandle<Result<FetchSummary, TransferError>>;
}

/// Runs the fetch on the runtime's blocking pool.
pub struct ThreadBackend {
    fetcher: Arc<dyn BulkFetch>,
}

impl ThreadBackend {
    pub fn new(fetcher: Arc<dyn BulkFetch>) -> Self {
        Self { fetcher }
    }
}

impl ExecutionBackend for ThreadBackend {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn launch(&self, job: FetchJob) -> JoinHandle<Result<FetchSummary, TransferError>> {
        let fetcher = Arc::clone(&self.fetcher);
        tokio::task::spawn_blocking(move || fetcher.fetch(&job))
    }
}

/// Runs the fetch as `<program> <base_args..> fetch <repo> --dest .. --cache-dir ..`.
///
/// Registry credentials are passed through `HF_TOKEN` and `HF_ENDPOINT` so
/// the token never shows up in a process listing. On success the child
/// prints its [`FetchSummary`] as one JSON line on stdout.
#[derive(Debug, Clone)]
pub struct SubprocessBackend {
    program: PathBuf,
    base_args: Vec<String>,
}

impl SubprocessBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Arguments placed before the `fetch` subcommand (e.g. `--config`).
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    /// Full argument list for `job`, excluding the program itself.
    pub fn command_args(&self, job: &FetchJob) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.push("fetch".to_string());
        args.push(job.repo_id.to_string());
        args.push("--dest".to_string());
        args.push(job.destination.display().to_string());
        args.push("--cache-dir".to_string());
        args.push(job.cache_dir.display().to_string());
        if let Some(pattern) = job.pattern.as_str() {
            args.push("--pattern".to_string());
            args.push(pattern.to_string());
        }
        if !job.resume {
            args.push("--no-resume".to_string());
        }
        args
    }
}

impl ExecutionBackend for SubprocessBackend {
    fn name(&self) -> &'static str {
        "subprocess"
    }

    fn launch(&self, job: FetchJob) -> JoinHandle<Result<FetchSummary, TransferError>> {
        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(&job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(token) = &job.token {
            command.env("HF_TOKEN", token);
        }
        if let Some(endpoint) = &job.endpoint {
            command.env("HF_ENDPOINT", endpoint);
        }
        let program = self.program.display().to_string();

        tokio::spawn(async move {
            debug!(program = %program, repo = %job.repo_id, "Spawning fetch process");
            let output = command
                .output()
                .await
                .map_err(|e| TransferError::Backend(format!("Failed to run {}: {}", program, e)))?;

            let detail = stderr_tail(&output.stderr);
            match output.status.code() {
                Some(0) => Ok(parse_summary(&output.stdout)),
                Some(FETCH_EXIT_REGISTRY) => Err(TransferError::Registry(detail)),
                Some(code) => Err(TransferError::Unexpected(format!(
                    "fetch process exited with {}: {}",
                    code, detail
                ))),
                None => Err(TransferError::Backend(format!(
                    "fetch process terminated by signal: {}",
                    detail
                ))),
            }
        })
    }
}

/// Last JSON line of child stdout, or an empty summary if there is none.
fn parse_summary(stdout: &[u8]) -> FetchSummary {
    let text = String::from_utf8_lossy(stdout);
    let parsed = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|line| serde_json::from_str::<FetchSummary>(line.trim()));
    match parsed {
        Some(Ok(summary)) => summary,
        Some(Err(e)) => {
            warn!(error = %e, "Unreadable fetch summary from child process");
            FetchSummary::default()
        }
        None => FetchSummary::default(),
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

//! Completion engine boundary.
//!
//! The [`CompletionEngine`] trait decouples the orchestration loop from the
//! model backend (currently a CLI subprocess). Tests use scripted engines
//! that return predetermined responses without spawning processes.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{ToolCall, TurnRecord};
use crate::io::process::run_command_with_timeout;
use crate::tools::ToolSpec;

/// Everything the engine needs for one completion call.
#[derive(Debug, Clone, Serialize)]
pub struct EngineRequest<'a> {
    /// Latest prompt or corrective feedback for this call.
    pub prompt: &'a str,
    /// Full session history, replayed verbatim.
    pub history: &'a [TurnRecord],
    /// JSON Schema the structured candidate must satisfy.
    pub result_schema: &'a Value,
    /// Tools the engine may request, with their argument schemas.
    pub tools: Vec<ToolSpec>,
}

/// Engine reply: either a structured candidate or tool-call requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineReply {
    Candidate { value: Value },
    ToolCalls { calls: Vec<ToolCall> },
}

/// One completion result with its reported cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    pub reply: EngineReply,
    /// Cost of this call in usage units, as reported by the backend.
    #[serde(default)]
    pub usage: u64,
}

/// The engine could not produce a response (spawn failure, timeout,
/// non-zero exit, unreadable output). Fatal to the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineUnavailableError {
    pub message: String,
}

impl fmt::Display for EngineUnavailableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "completion engine unavailable: {}", self.message)
    }
}

impl Error for EngineUnavailableError {}

/// Opaque generative reasoning capability.
pub trait CompletionEngine {
    fn complete(&self, request: &EngineRequest<'_>)
    -> Result<EngineResponse, EngineUnavailableError>;
}

/// Engine that spawns a configured command for each completion call.
///
/// The request is written to the child's stdin as JSON; the child must write
/// an [`EngineResponse`] JSON document to stdout. Anything on stderr is
/// treated as diagnostics and surfaced only on failure.
#[derive(Debug, Clone)]
pub struct CliEngine {
    /// Command and arguments, e.g. `["seeker-engine", "--model", "small"]`.
    pub command: Vec<String>,
    /// Working directory for the child process.
    pub workdir: PathBuf,
    /// Maximum time to wait for one completion call.
    pub timeout: Duration,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl CompletionEngine for CliEngine {
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs()))]
    fn complete(
        &self,
        request: &EngineRequest<'_>,
    ) -> Result<EngineResponse, EngineUnavailableError> {
        self.run(request).map_err(|err| EngineUnavailableError {
            message: format!("{err:#}"),
        })
    }
}

impl CliEngine {
    fn run(&self, request: &EngineRequest<'_>) -> anyhow::Result<EngineResponse> {
        let program = self
            .command
            .first()
            .ok_or_else(|| anyhow!("engine command is empty"))?;
        info!(program = %program, history_len = request.history.len(), "starting engine call");

        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..]).current_dir(&self.workdir);

        let payload = serde_json::to_vec(request).context("serialize engine request")?;
        let output = run_command_with_timeout(
            cmd,
            Some(&payload),
            self.timeout,
            self.output_limit_bytes,
        )
        .context("run engine command")?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "engine timed out");
            bail!("engine timed out after {:?}", self.timeout);
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "engine command failed");
            bail!(
                "engine exited with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let response: EngineResponse =
            serde_json::from_slice(&output.stdout).context("parse engine response")?;
        debug!(usage = response.usage, "parsed engine response");
        Ok(response)
    }
}

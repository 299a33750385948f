//! Session configuration stored in `seeker.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::usage::UsageLimits;
use crate::io::engine::CliEngine;

/// Session runner configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SeekerConfig {
    /// Command spawned for each completion call.
    pub engine_command: Vec<String>,

    /// Wall-clock budget for one engine call in seconds.
    pub engine_timeout_secs: u64,

    /// Truncate captured engine output beyond this many bytes.
    pub engine_output_limit_bytes: usize,

    /// Validation attempts tolerated per turn before giving up.
    pub max_attempts: u32,

    /// Usage ceilings for the whole session.
    pub limits: UsageLimits,

    /// Corrective text appended when the operator asks for another candidate.
    pub requery_feedback: String,

    /// Whether an operator-driven re-query starts a fresh attempt budget.
    pub reset_attempts_on_requery: bool,
}

impl Default for SeekerConfig {
    fn default() -> Self {
        Self {
            engine_command: vec!["seeker-engine".to_string()],
            engine_timeout_secs: 120,
            engine_output_limit_bytes: 100_000,
            max_attempts: 4,
            limits: UsageLimits::default(),
            requery_feedback: "Please suggest another flight".to_string(),
            reset_attempts_on_requery: true,
        }
    }
}

impl SeekerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.engine_command.is_empty() || self.engine_command[0].trim().is_empty() {
            return Err(anyhow!("engine_command must be a non-empty array"));
        }
        if self.engine_timeout_secs == 0 {
            return Err(anyhow!("engine_timeout_secs must be > 0"));
        }
        if self.engine_output_limit_bytes == 0 {
            return Err(anyhow!("engine_output_limit_bytes must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.limits.request_limit == Some(0) {
            return Err(anyhow!("limits.request_limit must be > 0 when set"));
        }
        if self.limits.unit_ceiling == Some(0) {
            return Err(anyhow!("limits.unit_ceiling must be > 0 when set"));
        }
        if self.requery_feedback.trim().is_empty() {
            return Err(anyhow!("requery_feedback must not be blank"));
        }
        Ok(())
    }

    /// Build the subprocess engine described by this config.
    pub fn engine(&self, workdir: &Path) -> CliEngine {
        CliEngine {
            command: self.engine_command.clone(),
            workdir: PathBuf::from(workdir),
            timeout: Duration::from_secs(self.engine_timeout_secs),
            output_limit_bytes: self.engine_output_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SeekerConfig::default()`.
pub fn load_config(path: &Path) -> Result<SeekerConfig> {
    if !path.exists() {
        let cfg = SeekerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SeekerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SeekerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

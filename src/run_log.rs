//! Append-only record of executed stages.
//!
//! Entries are appended to `<output_folder>/run_log.jsonl`:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"instance_id":"a","stage":"localize","success":true,...}
//! ```
use crate::exec::{CommandOutcome, CommandRun};
use crate::instances::InstanceId;
use crate::stages::{Stage, StageCommand};
use crate::util::{now_epoch_ms, truncate_string};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const RUN_LOG_SCHEMA_VERSION: u32 = 1;

const ERROR_PREVIEW_BYTES: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub schema_version: u32,
    /// Unix timestamp in milliseconds when the entry was written.
    pub ts: u64,
    pub instance_id: String,
    pub stage: Stage,
    pub command_line: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_preview: Option<String>,
}

impl RunLogEntry {
    pub fn new(id: &InstanceId, command: &StageCommand, run: &CommandRun) -> Result<Self> {
        let error_preview = match &run.outcome {
            CommandOutcome::Failed { stderr, .. } => {
                Some(truncate_string(stderr, ERROR_PREVIEW_BYTES))
            }
            CommandOutcome::Succeeded { .. } => None,
        };
        Ok(Self {
            schema_version: RUN_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms()?,
            instance_id: id.to_string(),
            stage: command.stage,
            command_line: command.command_line(),
            success: run.outcome.success(),
            exit_code: run.outcome.exit_code(),
            duration_ms: run.duration.as_millis() as u64,
            error_preview,
        })
    }
}

/// Append one entry as a JSONL line.
pub fn append_entry(path: &Path, entry: &RunLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create run log dir {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize run log entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

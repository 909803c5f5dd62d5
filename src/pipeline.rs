//! Per-instance pipeline driver.
//!
//! Each instance runs localize, merge, repair A, repair B, and rerank in that
//! order. A failing stage is reported and the next stage still runs; nothing
//! is retried or rolled back.
use crate::config::ResolvedConfig;
use crate::exec::{run_command, CommandOutcome};
use crate::instances::InstanceId;
use crate::paths::OutputPaths;
use crate::run_log::{append_entry, RunLogEntry};
use crate::stages::{plan_instance, Stage, PIPELINE_STAGES};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Stop after the first instance (single-instance debug runs).
    pub first_only: bool,
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: CommandOutcome,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct InstanceReport {
    pub id: InstanceId,
    pub result_dir: PathBuf,
    pub stages: Vec<StageReport>,
}

impl InstanceReport {
    pub fn failed_stages(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| !stage.outcome.success())
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub instances_read: usize,
    pub reports: Vec<InstanceReport>,
}

impl RunSummary {
    pub fn instances_processed(&self) -> usize {
        self.reports.len()
    }

    pub fn failed_stages(&self) -> usize {
        self.reports.iter().map(InstanceReport::failed_stages).sum()
    }
}

/// Run every stage for each instance, writing progress to `out`.
pub fn process_instances(
    out: &mut dyn Write,
    ids: &[InstanceId],
    paths: &OutputPaths,
    config: &ResolvedConfig,
    options: PipelineOptions,
) -> Result<RunSummary> {
    let mut summary = RunSummary {
        instances_read: ids.len(),
        reports: Vec::new(),
    };
    for (index, id) in ids.iter().enumerate() {
        let _span = tracing::info_span!("instance", id = %id, index).entered();
        let report = process_instance(out, id, paths, config)?;
        summary.reports.push(report);
        if options.first_only {
            tracing::info!(
                remaining = ids.len() - index - 1,
                "first-only mode: stopping after first instance"
            );
            break;
        }
    }
    Ok(summary)
}

/// Create the result folder and run the five stages for one instance.
pub fn process_instance(
    out: &mut dyn Write,
    id: &InstanceId,
    paths: &OutputPaths,
    config: &ResolvedConfig,
) -> Result<InstanceReport> {
    let result_paths = paths.instance(id);
    let result_dir = result_paths.root().to_path_buf();
    fs::create_dir_all(&result_dir)
        .with_context(|| format!("create result folder {}", result_dir.display()))?;
    writeln!(out, "Created folder: {}", result_dir.display())?;

    let mut stages = Vec::with_capacity(PIPELINE_STAGES.len());
    for command in plan_instance(config, id, &result_paths) {
        writeln!(out, "Running {}: {}", command.label(), command.command_line())?;
        let run = run_command(&command)?;
        writeln!(out, "{}", run.outcome.render())?;

        let entry = RunLogEntry::new(id, &command, &run)?;
        append_entry(&paths.run_log_path(), &entry)?;

        if !run.outcome.success() {
            tracing::warn!(
                stage = %command.stage,
                exit_code = ?run.outcome.exit_code(),
                "stage failed; continuing"
            );
        }
        stages.push(StageReport {
            stage: command.stage,
            outcome: run.outcome,
            duration: run.duration,
        });
    }
    Ok(InstanceReport {
        id: id.clone(),
        result_dir,
        stages,
    })
}

#[cfg(all(test, unix))]
#[path = "pipeline_tests.rs"]
mod tests;

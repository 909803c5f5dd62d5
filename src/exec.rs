//! Synchronous stage execution.
//!
//! Commands run by argv, never through a shell. Output is captured in full
//! and decoded lossily.
use crate::stages::StageCommand;
use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Captured result of one stage command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded {
        stdout: String,
    },
    Failed {
        stderr: String,
        /// `None` when the program never started or was killed by a signal.
        exit_code: Option<i32>,
    },
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Succeeded { .. } => Some(0),
            Self::Failed { exit_code, .. } => *exit_code,
        }
    }

    /// Stdout verbatim on success, `Error: <stderr>` on failure.
    pub fn render(&self) -> String {
        match self {
            Self::Succeeded { stdout } => stdout.clone(),
            Self::Failed { stderr, .. } => format!("Error: {stderr}"),
        }
    }
}

/// Outcome plus wall-clock time.
#[derive(Debug, Clone)]
pub struct CommandRun {
    pub outcome: CommandOutcome,
    pub duration: Duration,
}

/// Run a stage command to completion.
///
/// Non-zero exits and spawn failures become `CommandOutcome::Failed`; only
/// I/O errors while collecting output are returned as errors.
pub fn run_command(command: &StageCommand) -> Result<CommandRun> {
    let start = Instant::now();
    let spawned = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let child = match spawned {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(
                stage = %command.stage,
                program = %command.program.to_string_lossy(),
                %err,
                "spawn failed"
            );
            return Ok(CommandRun {
                outcome: CommandOutcome::Failed {
                    stderr: format!(
                        "failed to spawn {}: {err}",
                        command.program.to_string_lossy()
                    ),
                    exit_code: None,
                },
                duration: start.elapsed(),
            });
        }
    };
    let output = child
        .wait_with_output()
        .with_context(|| format!("wait for {} command", command.stage))?;
    let duration = start.elapsed();

    tracing::info!(
        stage = %command.stage,
        elapsed_ms = duration.as_millis() as u64,
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        success = output.status.success(),
        "stage command complete"
    );

    let outcome = if output.status.success() {
        CommandOutcome::Succeeded {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        }
    } else {
        CommandOutcome::Failed {
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }
    };
    Ok(CommandRun { outcome, duration })
}

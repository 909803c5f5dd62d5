//! Shared test infrastructure for integration tests.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Subset of a `run_log.jsonl` line the tests inspect.
#[derive(Debug, Deserialize)]
pub struct LoggedStage {
    pub instance_id: String,
    pub stage: String,
    pub success: bool,
    pub command_line: String,
}

/// Scratch workspace holding an input list, an output folder, and an
/// isolated config home so the user's own config never leaks in.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(input: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("ids.txt"), input).expect("write input file");
        std::fs::create_dir_all(dir.path().join("config-home")).expect("create config home");
        Self { dir }
    }

    pub fn input_file(&self) -> PathBuf {
        self.dir.path().join("ids.txt")
    }

    pub fn output_folder(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn write_config(&self, json: &str) -> PathBuf {
        let path = self.dir.path().join("driver.json");
        std::fs::write(&path, json).expect("write config");
        path
    }

    /// Write the per-user config under the isolated config home.
    pub fn write_user_config(&self, json: &str) -> PathBuf {
        let dir = self.dir.path().join("config-home").join("agentless-batch");
        std::fs::create_dir_all(&dir).expect("create user config dir");
        let path = dir.join("config.json");
        std::fs::write(&path, json).expect("write user config");
        path
    }

    pub fn run(&self, extra: &[&str]) -> Output {
        self.run_with_input(&self.input_file(), extra)
    }

    pub fn run_with_input(&self, input: &Path, extra: &[&str]) -> Output {
        self.command(input, extra)
            .output()
            .expect("run agentless-batch")
    }

    /// Run with extra environment variables set on top of the isolated base.
    pub fn run_with_env(&self, extra: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut command = self.command(&self.input_file(), extra);
        for (key, value) in envs {
            command.env(key, value);
        }
        command.output().expect("run agentless-batch")
    }

    fn command(&self, input: &Path, extra: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_agentless-batch"));
        command
            .arg("--input_file")
            .arg(input)
            .arg("--output_folder")
            .arg(self.output_folder())
            .args(extra)
            .env("XDG_CONFIG_HOME", self.dir.path().join("config-home"))
            .env_remove("AGENTLESS_PYTHON")
            .env_remove("RUST_LOG");
        command
    }

    pub fn logged_stages(&self) -> Vec<LoggedStage> {
        let path = self.output_folder().join("run_log.jsonl");
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Vec::new();
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("parse run log line"))
            .collect()
    }

    pub fn result_dirs(&self) -> Vec<String> {
        let mut names = std::fs::read_dir(self.output_folder())
            .expect("read output folder")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

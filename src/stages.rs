//! Stage command construction.
//!
//! Each builder takes the typed outputs of the stage before it and returns
//! the command record plus the outputs it expects the tool to write. The
//! driver never checks those outputs exist; the types only make the hand-off
//! between stages explicit.
use crate::config::ResolvedConfig;
use crate::instances::InstanceId;
use crate::paths::ResultPaths;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

const LOCALIZE_SCRIPT: &str = "agentless/fl/localize.py";
const REPAIR_SCRIPT: &str = "agentless/repair/repair.py";
const RERANK_SCRIPT: &str = "agentless/repair/rerank.py";

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Localize,
    Merge,
    RepairA,
    RepairB,
    Rerank,
}

pub const PIPELINE_STAGES: [Stage; 5] = [
    Stage::Localize,
    Stage::Merge,
    Stage::RepairA,
    Stage::RepairB,
    Stage::Rerank,
];

impl Stage {
    /// Human-readable label printed before the command runs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Localize => "Localize files",
            Self::Merge => "Merge localized locations",
            Self::RepairA => "Repair (merged locations 0-1)",
            Self::RepairB => "Repair (merged locations 2-3)",
            Self::Rerank => "Rerank patches",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Localize => write!(f, "localize"),
            Self::Merge => write!(f, "merge"),
            Self::RepairA => write!(f, "repair_a"),
            Self::RepairB => write!(f, "repair_b"),
            Self::Rerank => write!(f, "rerank"),
        }
    }
}

/// Which merged location file a repair run reads, and where it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairVariant {
    /// Merged locations 0-1 into `repair_run_1`.
    A,
    /// Merged locations 2-3 into `repair_run_2`.
    B,
}

impl RepairVariant {
    pub fn stage(self) -> Stage {
        match self {
            Self::A => Stage::RepairA,
            Self::B => Stage::RepairB,
        }
    }

    fn run(self) -> u32 {
        match self {
            Self::A => 1,
            Self::B => 2,
        }
    }
}

/// One fully-formed pipeline step: a program and its argv.
///
/// Arguments are OS strings so paths reach the tools byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl StageCommand {
    pub fn label(&self) -> &'static str {
        self.stage.label()
    }

    /// Shell-quoted, lossy rendering for display and logs. Never executed
    /// by a shell.
    pub fn command_line(&self) -> String {
        let words = std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| word.to_string_lossy());
        shell_words::join(words)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizeOutput {
    pub loc_outputs: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutput {
    pub merged_0_1: PathBuf,
    pub merged_2_3: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutput {
    pub folder: PathBuf,
}

/// Builds the command records for one instance.
pub struct StageBuilder<'a> {
    config: &'a ResolvedConfig,
    id: &'a InstanceId,
    paths: &'a ResultPaths,
}

impl<'a> StageBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig, id: &'a InstanceId, paths: &'a ResultPaths) -> Self {
        Self { config, id, paths }
    }

    pub fn localize(&self) -> (StageCommand, LocalizeOutput) {
        let settings = &self.config.localize;
        let mut args = Vec::new();
        push_word(&mut args, "--file_level");
        push_word(&mut args, "--related_level");
        push_word(&mut args, "--fine_grain_line_level");
        push_flag(&mut args, "--output_folder", self.paths.root());
        push_flag(&mut args, "--top_n", settings.top_n.to_string());
        push_word(&mut args, "--compress");
        push_word(&mut args, format!("--context_window={}", settings.context_window));
        push_flag(&mut args, "--temperature", settings.temperature.to_string());
        push_flag(&mut args, "--num_samples", settings.num_samples.to_string());
        push_flag(&mut args, "--target_id", self.id.as_str());
        let output = LocalizeOutput {
            loc_outputs: self.paths.loc_outputs_path(),
        };
        (self.command(Stage::Localize, LOCALIZE_SCRIPT, args), output)
    }

    pub fn merge(&self, localized: &LocalizeOutput) -> (StageCommand, MergeOutput) {
        let mut args = Vec::new();
        push_word(&mut args, "--merge");
        push_flag(&mut args, "--output_folder", self.paths.location_merged_dir());
        push_flag(&mut args, "--start_file", &localized.loc_outputs);
        push_flag(
            &mut args,
            "--num_samples",
            self.config.merge.num_samples.to_string(),
        );
        let output = MergeOutput {
            merged_0_1: self.paths.merged_0_1_path(),
            merged_2_3: self.paths.merged_2_3_path(),
        };
        (self.command(Stage::Merge, LOCALIZE_SCRIPT, args), output)
    }

    pub fn repair(
        &self,
        variant: RepairVariant,
        merged: &MergeOutput,
    ) -> (StageCommand, RepairOutput) {
        let loc_file = match variant {
            RepairVariant::A => &merged.merged_0_1,
            RepairVariant::B => &merged.merged_2_3,
        };
        let settings = &self.config.repair;
        let folder = self.paths.repair_run_dir(variant.run());
        let mut args = Vec::new();
        push_flag(&mut args, "--loc_file", loc_file);
        push_flag(&mut args, "--output_folder", &folder);
        push_word(&mut args, "--loc_interval");
        push_word(&mut args, format!("--top_n={}", settings.top_n));
        push_word(&mut args, format!("--context_window={}", settings.context_window));
        push_flag(&mut args, "--max_samples", settings.max_samples.to_string());
        push_word(&mut args, "--cot");
        push_word(&mut args, "--diff_format");
        push_word(&mut args, "--gen_and_process");
        push_flag(&mut args, "--target_id", self.id.as_str());
        let command = self.command(variant.stage(), REPAIR_SCRIPT, args);
        (command, RepairOutput { folder })
    }

    pub fn rerank(&self, repairs: &[RepairOutput]) -> StageCommand {
        let mut folders = OsString::new();
        for (index, repair) in repairs.iter().enumerate() {
            if index > 0 {
                folders.push(",");
            }
            folders.push(repair.folder.as_os_str());
        }
        let mut args = Vec::new();
        push_flag(&mut args, "--patch_folder", folders);
        push_flag(
            &mut args,
            "--num_samples",
            self.config.rerank.num_samples.to_string(),
        );
        push_word(&mut args, "--deduplicate");
        push_word(&mut args, "--plausible");
        self.command(Stage::Rerank, RERANK_SCRIPT, args)
    }

    fn command(&self, stage: Stage, script: &str, flags: Vec<OsString>) -> StageCommand {
        let (program, interpreter_args) = match self.config.python.split_first() {
            Some((program, rest)) => (OsString::from(program), rest),
            None => (OsString::from("python"), &[][..]),
        };
        let script = match &self.config.tools_root {
            Some(root) => root.join(script).into_os_string(),
            None => OsString::from(script),
        };
        let mut args = interpreter_args
            .iter()
            .map(OsString::from)
            .collect::<Vec<_>>();
        args.push(script);
        args.extend(flags);
        StageCommand {
            stage,
            program,
            args,
        }
    }
}

/// Build all five commands for one instance, chaining stage outputs.
pub fn plan_instance(
    config: &ResolvedConfig,
    id: &InstanceId,
    paths: &ResultPaths,
) -> Vec<StageCommand> {
    let builder = StageBuilder::new(config, id, paths);
    let (localize, localized) = builder.localize();
    let (merge, merged) = builder.merge(&localized);
    let (repair_a, first) = builder.repair(RepairVariant::A, &merged);
    let (repair_b, second) = builder.repair(RepairVariant::B, &merged);
    let rerank = builder.rerank(&[first, second]);
    vec![localize, merge, repair_a, repair_b, rerank]
}

fn push_word(args: &mut Vec<OsString>, word: impl Into<OsString>) {
    args.push(word.into());
}

fn push_flag(args: &mut Vec<OsString>, flag: &str, value: impl AsRef<OsStr>) {
    args.push(OsString::from(flag));
    args.push(value.as_ref().to_os_string());
}

#[cfg(test)]
#[path = "stages_tests.rs"]
mod tests;

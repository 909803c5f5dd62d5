//! Typed paths into the per-instance result layout.
//!
//! Every path a stage reads or writes is derived here so the stage builders
//! never concatenate strings themselves.
use crate::instances::InstanceId;
use std::path::{Path, PathBuf};

pub const RUN_LOG_FILE: &str = "run_log.jsonl";

/// Paths rooted at the output folder.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `run_log.jsonl` path.
    pub fn run_log_path(&self) -> PathBuf {
        self.root.join(RUN_LOG_FILE)
    }

    /// Return the path helper for one instance's `result_<id>` directory.
    pub fn instance(&self, id: &InstanceId) -> ResultPaths {
        ResultPaths {
            root: self.root.join(format!("result_{id}")),
        }
    }
}

/// Paths inside one `result_<id>` directory.
#[derive(Debug, Clone)]
pub struct ResultPaths {
    root: PathBuf,
}

impl ResultPaths {
    /// Return the `result_<id>` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `loc_outputs.jsonl` path written by localize.
    pub fn loc_outputs_path(&self) -> PathBuf {
        self.root.join("loc_outputs.jsonl")
    }

    /// Return the `location_merged/` directory.
    pub fn location_merged_dir(&self) -> PathBuf {
        self.root.join("location_merged")
    }

    /// Return the merged locations for samples 0-1.
    pub fn merged_0_1_path(&self) -> PathBuf {
        self.location_merged_dir().join("loc_merged_0-1_outputs.jsonl")
    }

    /// Return the merged locations for samples 2-3.
    pub fn merged_2_3_path(&self) -> PathBuf {
        self.location_merged_dir().join("loc_merged_2-3_outputs.jsonl")
    }

    /// Return the `repair_run_<n>/` directory.
    pub fn repair_run_dir(&self, run: u32) -> PathBuf {
        self.root.join(format!("repair_run_{run}"))
    }
}

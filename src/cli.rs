//! CLI argument parsing for the batch driver.
use clap::Parser;
use std::path::PathBuf;

/// Run the Agentless localize/repair/rerank pipeline over a list of instances.
#[derive(Parser, Debug)]
#[command(
    name = "agentless-batch",
    version,
    about = "Run the localize, merge, repair, and rerank stages for each instance ID",
    after_help = "Examples:\n  agentless-batch --input_file ids.txt --output_folder results\n  agentless-batch --input_file ids.txt --output_folder results --first-only\n  agentless-batch --input_file ids.txt --output_folder results --config driver.json --verbose"
)]
pub struct RootArgs {
    /// Newline-delimited list of instance IDs
    #[arg(long = "input_file", visible_alias = "input-file", value_name = "PATH")]
    pub input_file: PathBuf,

    /// Root folder for per-instance result folders
    #[arg(long = "output_folder", visible_alias = "output-folder", value_name = "DIR")]
    pub output_folder: PathBuf,

    /// Driver config JSON (interpreter, tools root, stage tunables)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interpreter command for the stage scripts (overrides config and AGENTLESS_PYTHON)
    #[arg(long, value_name = "CMD")]
    pub python: Option<String>,

    /// Process only the first instance, then stop
    #[arg(long)]
    pub first_only: bool,

    /// Emit info-level logs to stderr
    #[arg(long)]
    pub verbose: bool,
}

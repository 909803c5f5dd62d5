use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod exec;
mod instances;
mod paths;
mod pipeline;
mod run_log;
mod stages;
mod util;

use cli::RootArgs;
use paths::OutputPaths;
use pipeline::{process_instances, PipelineOptions};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    run(&args)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &RootArgs) -> Result<()> {
    let driver_config = config::load_effective_config(args.config.as_deref())?;
    let resolved = config::resolve_config(driver_config, args.python.as_deref())?;

    fs::create_dir_all(&args.output_folder)
        .with_context(|| format!("create output folder {}", args.output_folder.display()))?;

    let ids = instances::read_instances(&args.input_file)?;
    tracing::info!(count = ids.len(), input = %args.input_file.display(), "read instance ids");

    let paths = OutputPaths::new(args.output_folder.clone());
    let options = PipelineOptions {
        first_only: args.first_only,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = process_instances(&mut out, &ids, &paths, &resolved, options)?;
    drop(out);

    for report in &summary.reports {
        let failed = report
            .stages
            .iter()
            .filter(|stage| !stage.outcome.success())
            .map(|stage| stage.stage.to_string())
            .collect::<Vec<_>>();
        let elapsed_ms: u128 = report.stages.iter().map(|s| s.duration.as_millis()).sum();
        tracing::info!(
            id = %report.id,
            result_dir = %report.result_dir.display(),
            elapsed_ms = elapsed_ms as u64,
            failed = ?failed,
            "instance finished"
        );
    }
    if summary.failed_stages() > 0 {
        tracing::warn!(
            failed_stages = summary.failed_stages(),
            processed = summary.instances_processed(),
            "some stages failed; see run_log.jsonl"
        );
    }
    println!(
        "Processed {} instance IDs. Result folders created in {}",
        summary.instances_read,
        paths.root().display()
    );
    Ok(())
}

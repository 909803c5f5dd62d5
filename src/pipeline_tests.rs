use super::*;
use crate::config::{resolve_config, DriverConfig};
use crate::instances::parse_instances;
use std::path::Path;

fn resolved(python: &str) -> ResolvedConfig {
    resolve_config(DriverConfig::default(), Some(python)).expect("resolve config")
}

fn run(
    root: &Path,
    input: &str,
    config: &ResolvedConfig,
    options: PipelineOptions,
) -> (RunSummary, String) {
    let ids = parse_instances(input);
    let paths = OutputPaths::new(root.to_path_buf());
    let mut out = Vec::new();
    let summary =
        process_instances(&mut out, &ids, &paths, config, options).expect("process instances");
    (summary, String::from_utf8(out).expect("utf-8 output"))
}

fn run_log_lines(root: &Path) -> usize {
    std::fs::read_to_string(root.join("run_log.jsonl"))
        .map(|text| text.lines().count())
        .unwrap_or(0)
}

#[test]
fn every_instance_gets_a_result_folder_and_five_stages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (summary, output) = run(
        dir.path(),
        "a\n\nb\n",
        &resolved("true"),
        PipelineOptions::default(),
    );

    assert_eq!(summary.instances_read, 2);
    assert_eq!(summary.instances_processed(), 2);
    assert_eq!(summary.failed_stages(), 0);
    assert!(dir.path().join("result_a").is_dir());
    assert!(dir.path().join("result_b").is_dir());
    for report in &summary.reports {
        let stages = report.stages.iter().map(|s| s.stage).collect::<Vec<_>>();
        assert_eq!(stages, PIPELINE_STAGES.to_vec());
    }
    assert_eq!(output.matches("Running ").count(), 10);
    assert!(output.contains(&format!(
        "Created folder: {}",
        dir.path().join("result_a").display()
    )));
    assert_eq!(run_log_lines(dir.path()), 10);
}

#[test]
fn first_only_stops_after_the_first_instance() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = PipelineOptions { first_only: true };
    let (summary, output) = run(dir.path(), "a\n\nb\n", &resolved("true"), options);

    assert_eq!(summary.instances_read, 2);
    assert_eq!(summary.instances_processed(), 1);
    assert!(dir.path().join("result_a").is_dir());
    assert!(!dir.path().join("result_b").exists());
    assert_eq!(output.matches("Running ").count(), 5);
    assert_eq!(run_log_lines(dir.path()), 5);
}

#[test]
fn failing_stages_are_reported_and_do_not_stop_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (summary, output) = run(
        dir.path(),
        "a\nb\n",
        &resolved("false"),
        PipelineOptions::default(),
    );

    assert_eq!(summary.instances_processed(), 2);
    assert_eq!(summary.failed_stages(), 10);
    assert!(dir.path().join("result_a").is_dir());
    assert!(dir.path().join("result_b").is_dir());
    assert_eq!(output.matches("Error: ").count(), 10);
}

#[test]
fn a_failed_repair_still_runs_rerank() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("fake_tool.sh");
    std::fs::write(
        &script,
        "case \"$1\" in\n  *repair.py) echo \"repair exploded\" >&2; exit 1 ;;\nesac\necho \"ran $1\"\n",
    )
    .expect("write fake tool");
    let python = format!("sh {}", shell_words::quote(&script.display().to_string()));
    let out_root = dir.path().join("out");
    let (summary, output) = run(&out_root, "a\n", &resolved(&python), PipelineOptions::default());

    let report = &summary.reports[0];
    let outcomes = report
        .stages
        .iter()
        .map(|s| (s.stage, s.outcome.success()))
        .collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![
            (Stage::Localize, true),
            (Stage::Merge, true),
            (Stage::RepairA, false),
            (Stage::RepairB, false),
            (Stage::Rerank, true),
        ]
    );
    assert!(output.contains("Error: repair exploded\n"));
    assert!(output.contains("ran agentless/repair/rerank.py\n"));
}

#[test]
fn rerunning_into_an_existing_folder_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("result_a")).expect("precreate");
    std::fs::write(dir.path().join("result_a").join("keep.txt"), "x").expect("write marker");
    let (summary, _) = run(dir.path(), "a\n", &resolved("true"), PipelineOptions::default());

    assert_eq!(summary.instances_processed(), 1);
    assert!(dir.path().join("result_a").join("keep.txt").is_file());
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_output_folder_reaches_the_tool_intact() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("check_folder.sh");
    std::fs::write(
        &script,
        "while [ $# -gt 0 ]; do\n  if [ \"$1\" = --output_folder ]; then\n    \
         if [ -d \"$2\" ]; then echo FOUND; exit 0; fi\n    echo MISSING >&2; exit 1\n  fi\n  \
         shift\ndone\nexit 2\n",
    )
    .expect("write fake tool");
    let python = format!("sh {}", shell_words::quote(&script.display().to_string()));
    let out_root = dir.path().join(OsStr::from_bytes(b"o\xffut"));
    let (summary, output) = run(&out_root, "a\n", &resolved(&python), PipelineOptions::default());

    let report = &summary.reports[0];
    assert!(report.result_dir.is_dir());
    assert_eq!(report.stages[0].stage, Stage::Localize);
    assert!(report.stages[0].outcome.success(), "{output}");
    assert!(output.contains("FOUND\n"));
}

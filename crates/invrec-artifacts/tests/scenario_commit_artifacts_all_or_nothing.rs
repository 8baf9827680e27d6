//! Artifacts written together either all land or none of them change.

use invrec_artifacts::{commit_artifacts, init_run_artifacts, report_bytes, InitRunArtifactsArgs};
use serde_json::json;
use uuid::Uuid;

fn run_dir(root: &std::path::Path) -> invrec_artifacts::RunDir {
    init_run_artifacts(InitRunArtifactsArgs {
        root,
        run_id: Uuid::new_v4(),
        source_filename: "export.csv",
        config_hash: "abc123",
    })
    .unwrap()
}

#[test]
fn all_files_replaced_together() {
    let root = tempfile::tempdir().unwrap();
    let run = run_dir(root.path());
    std::fs::write(run.final_path(), "old final\n").unwrap();

    commit_artifacts(&[
        (run.completed_path(), b"session_id\n".to_vec()),
        (run.report_path(), report_bytes(&json!({"adjusted_lines": 1})).unwrap()),
        (run.final_path(), b"new final\n".to_vec()),
    ])
    .unwrap();

    assert_eq!(std::fs::read_to_string(run.final_path()).unwrap(), "new final\n");
    let report = std::fs::read_to_string(run.report_path()).unwrap();
    assert!(report.ends_with("}\n"));
    assert!(report.contains("\"adjusted_lines\": 1"));

    let leftovers: Vec<_> = std::fs::read_dir(&run.dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn failed_write_leaves_previous_files_alone() {
    let root = tempfile::tempdir().unwrap();
    let run = run_dir(root.path());
    std::fs::write(run.final_path(), "old final\n").unwrap();
    std::fs::write(run.report_path(), "old report\n").unwrap();

    let unwritable = run.dir.join("missing-dir").join("report.json");
    let err = commit_artifacts(&[
        (run.final_path(), b"new final\n".to_vec()),
        (unwritable, b"{}\n".to_vec()),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("write artifact failed"));

    assert_eq!(std::fs::read_to_string(run.final_path()).unwrap(), "old final\n");
    assert_eq!(std::fs::read_to_string(run.report_path()).unwrap(), "old report\n");
    assert!(!run.dir.join("final.csv.partial").exists());
}

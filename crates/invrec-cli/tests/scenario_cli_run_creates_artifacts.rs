use assert_cmd::prelude::*;
use std::path::PathBuf;
use std::process::Command;

const RAW: &str = "\
E;SES1;Inventaire;1;SITE1
L;SES1;2506INV01;1;SITE1
S;SES1;2506INV01;1000;SITE1;10;;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;2506INV01;2000;SITE1;5;;1;ART1;EMP01;A;UN;0;ZONE1;LOT010325
S;SES1;2506INV01;3000;SITE1;4;;1;ART2;EMP01;A;UN;0;ZONE1;LOT050125
";

const COMPLETED: &str = "\
session_id,inventory_id,article,stock_status,theoretical_qty,counted_qty,unit,zone,location
SES1,2506INV01,ART1,A,15,13,UN,ZONE1,EMP01
SES1,2506INV01,ART2,A,4,4,UN,ZONE1,EMP01
";

fn kv(stdout: &str, key: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix(&format!("{key}=")).map(str::to_string))
}

#[test]
fn full_run_writes_every_artifact_and_a_valid_audit_chain() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("runs");
    let input = dir.path().join("export.csv");
    let completed = dir.path().join("completed.csv");
    std::fs::write(&input, RAW)?;
    std::fs::write(&completed, COMPLETED)?;

    let out = Command::cargo_bin("invrec")?
        .args(["run", "--input"])
        .arg(&input)
        .arg("--completed")
        .arg(&completed)
        .arg("--root")
        .arg(&root)
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;

    assert_eq!(kv(&stdout, "status").as_deref(), Some("completed"));
    let run_dir = PathBuf::from(kv(&stdout, "run_dir").expect("run_dir"));
    assert!(run_dir.starts_with(&root));

    for name in [
        "input.csv",
        "template.csv",
        "completed.csv",
        "final.csv",
        "report.json",
        "manifest.json",
    ] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }
    let final_text = std::fs::read_to_string(run_dir.join("final.csv"))?;
    assert!(final_text.contains("S;SES1;2506INV01;1000;SITE1;8;8;2;ART1"));

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join("manifest.json"))?)?;
    assert_eq!(manifest["strategy"], "FIFO");
    assert_eq!(manifest["source_filename"], "export.csv");

    let audit = std::fs::read_to_string(run_dir.join("audit.jsonl"))?;
    assert_eq!(audit.lines().count(), 4);
    assert!(invrec_audit::verify_hash_chain_str(&audit)?.is_valid());

    Command::cargo_bin("invrec")?
        .args(["audit", "verify"])
        .arg(run_dir.join("audit.jsonl"))
        .assert()
        .success();
    Ok(())
}

#[test]
fn run_without_completed_template_stops_after_template() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("runs");
    let input = dir.path().join("export.csv");
    std::fs::write(&input, RAW)?;

    let out = Command::cargo_bin("invrec")?
        .args(["run", "--input"])
        .arg(&input)
        .arg("--root")
        .arg(&root)
        .output()?;
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout)?;
    assert_eq!(kv(&stdout, "status").as_deref(), Some("template_generated"));

    let run_dir = PathBuf::from(kv(&stdout, "run_dir").expect("run_dir"));
    assert!(run_dir.join("template.csv").exists());
    assert!(!run_dir.join("final.csv").exists());
    Ok(())
}

#[test]
fn two_runs_never_share_a_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("runs");
    let input = dir.path().join("export.csv");
    std::fs::write(&input, RAW)?;

    let mut dirs = Vec::new();
    for _ in 0..2 {
        let out = Command::cargo_bin("invrec")?
            .args(["run", "--input"])
            .arg(&input)
            .arg("--root")
            .arg(&root)
            .output()?;
        assert!(out.status.success());
        dirs.push(kv(&String::from_utf8(out.stdout)?, "run_dir").expect("run_dir"));
    }
    assert_ne!(dirs[0], dirs[1]);
    Ok(())
}

#[test]
fn failed_run_records_failure_in_audit_log() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("runs");
    let input = dir.path().join("export.csv");
    std::fs::write(&input, "E;SES1;x\n")?;

    Command::cargo_bin("invrec")?
        .args(["run", "--input"])
        .arg(&input)
        .arg("--root")
        .arg(&root)
        .assert()
        .failure();

    let run_dir = std::fs::read_dir(&root)?.next().expect("one run dir")?.path();
    let audit = std::fs::read_to_string(run_dir.join("audit.jsonl"))?;
    assert!(audit.contains("\"FAILED\""));
    Ok(())
}

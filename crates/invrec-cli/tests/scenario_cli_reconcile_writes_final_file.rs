use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const COUNTED: &str = "\
E;SES1;Inventaire;1;SITE1
L;SES1;2506INV01;1;SITE1
S;SES1;2506INV01;1000;SITE1;10;8;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;2506INV01;2000;SITE1;5;5;1;ART1;EMP01;A;UN;0;ZONE1;LOT010325
";

#[test]
fn reconcile_writes_output_and_prints_stats() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("export.csv");
    let output = dir.path().join("final.csv");
    let report = dir.path().join("report.json");
    std::fs::write(&input, COUNTED)?;

    Command::cargo_bin("invrec")?
        .args(["reconcile", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("adjusted_lines=1"))
        .stdout(predicate::str::contains("unchanged_lines=1"))
        .stdout(predicate::str::contains("strategy=FIFO"))
        .stdout(predicate::str::contains("config_hash="));

    let expected = "\
E;SES1;Inventaire;1;SITE1
L;SES1;2506INV01;1;SITE1
S;SES1;2506INV01;1000;SITE1;8;8;2;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;2506INV01;2000;SITE1;5;5;1;ART1;EMP01;A;UN;0;ZONE1;LOT010325
";
    assert_eq!(std::fs::read_to_string(&output)?, expected);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert_eq!(json["adjusted_lines"], 1);
    assert_eq!(json["strategy"], "FIFO");
    Ok(())
}

#[test]
fn strategy_flag_overrides_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("export.csv");
    std::fs::write(&input, COUNTED)?;

    Command::cargo_bin("invrec")?
        .args(["reconcile", "--strategy", "lifo", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("out.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy=LIFO"));
    Ok(())
}

#[test]
fn output_over_input_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("export.csv");
    std::fs::write(&input, COUNTED)?;

    Command::cargo_bin("invrec")?
        .args(["reconcile", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must differ"));
    assert_eq!(std::fs::read_to_string(&input)?, COUNTED);
    Ok(())
}

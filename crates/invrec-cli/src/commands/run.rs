//! `invrec run`: the whole pipeline inside a fresh run directory.
//!
//! upload → template → (completed template → distribute → reconcile).
//! Every step is appended to the run's audit log; a failure is logged as a
//! FAILED event before the error is returned.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use invrec_artifacts::{
    commit_artifacts, init_run_artifacts, report_bytes, update_manifest, write_artifact,
    InitRunArtifactsArgs, RunDir,
};
use invrec_audit::{events, AuditWriter};
use invrec_engine::{ReconcileOptions, ReconcileReport};
use invrec_records::{inventory_date, parse_str, InventoryFile};
use invrec_template::{apply_completed_template, parse_completed_template, render_template};
use serde_json::json;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{load_cli_config, print_report, read_text};

enum Outcome {
    TemplateGenerated,
    Completed(ReconcileReport),
}

pub fn run(
    input: &str,
    completed: Option<&str>,
    strategy: Option<String>,
    config_paths: &[String],
    root: Option<String>,
) -> Result<()> {
    let cfg = load_cli_config(config_paths)?;
    let opts = cfg.options(strategy.as_deref())?;
    let root = PathBuf::from(root.unwrap_or_else(|| cfg.settings.storage.root.clone()));

    let source_filename = Path::new(input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string());

    let run_id = Uuid::new_v4();
    let run = init_run_artifacts(InitRunArtifactsArgs {
        root: &root,
        run_id,
        source_filename: &source_filename,
        config_hash: &cfg.loaded.config_hash,
    })?;
    let mut audit = AuditWriter::open(run.audit_path(), true)?;

    let outcome = match pipeline(&run, &mut audit, input, completed, &opts) {
        Ok(o) => o,
        Err(e) => {
            audit.append(
                run_id,
                events::TOPIC_RECONCILE,
                events::FAILED,
                json!({ "error": format!("{e:#}") }),
            )?;
            return Err(e).with_context(|| format!("run {run_id} failed"));
        }
    };

    println!("run_id={run_id}");
    println!("run_dir={}", run.dir.display());
    println!("config_hash={}", cfg.loaded.config_hash);
    println!("template={}", run.template_path().display());
    match outcome {
        Outcome::TemplateGenerated => println!("status=template_generated"),
        Outcome::Completed(report) => {
            println!("status=completed");
            println!("final={}", run.final_path().display());
            print_report(&report);
        }
    }
    println!("audit={}", run.audit_path().display());
    Ok(())
}

fn pipeline(
    run: &RunDir,
    audit: &mut AuditWriter,
    input: &str,
    completed: Option<&str>,
    opts: &ReconcileOptions,
) -> Result<Outcome> {
    let text = read_text(input, "input")?;
    write_artifact(&run.input_path(), &text)?;

    let mut file =
        parse_str(&text, opts.delimiter).with_context(|| format!("parse failed: {input}"))?;
    audit.append(
        run.run_id,
        events::TOPIC_SESSION,
        events::UPLOADED,
        upload_payload(&file),
    )?;

    let template = render_template(&file, &opts.classifier)?;
    write_artifact(&run.template_path(), &template)?;
    audit.append(
        run.run_id,
        events::TOPIC_SESSION,
        events::TEMPLATE_RENDERED,
        json!({ "rows": template.lines().count().saturating_sub(1) }),
    )?;

    let Some(completed) = completed else {
        return Ok(Outcome::TemplateGenerated);
    };

    let completed_text = read_text(completed, "completed template")?;
    write_artifact(&run.completed_path(), &completed_text)?;
    let rows = parse_completed_template(&completed_text)
        .with_context(|| format!("completed template rejected: {completed}"))?;
    let summaries = apply_completed_template(&mut file, &rows, opts.strategy, &opts.classifier)?;
    audit.append(
        run.run_id,
        events::TOPIC_RECONCILE,
        events::COUNTS_APPLIED,
        json!({
            "rows": rows.len(),
            "aggregates": summaries.iter().map(|s| s.aggregates).sum::<usize>(),
            "lines": summaries.iter().map(|s| s.lines).sum::<usize>(),
        }),
    )?;

    let out = invrec_engine::reconcile(&file, opts).context("reconcile failed")?;
    commit_artifacts(&[
        (run.report_path(), report_bytes(&out.report)?),
        (run.final_path(), out.text.into_bytes()),
    ])?;
    update_manifest(run, |m| m.strategy = Some(opts.strategy.to_string()))?;
    audit.append(
        run.run_id,
        events::TOPIC_RECONCILE,
        events::RECONCILED,
        serde_json::to_value(&out.report).context("serialize report failed")?,
    )?;

    Ok(Outcome::Completed(out.report))
}

fn upload_payload(file: &InventoryFile) -> serde_json::Value {
    let year = Utc::now().year();
    let inventory_date = file
        .sessions
        .first()
        .and_then(|s| s.first_inventory_id())
        .and_then(|id| inventory_date(id, year))
        .map(|d| d.to_string());
    json!({
        "sessions": file.sessions.iter().map(|s| s.session_id()).collect::<Vec<_>>(),
        "stock_lines": file.stock_line_count(),
        "inventory_date": inventory_date,
    })
}

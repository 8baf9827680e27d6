//! Blocking session work: upload, process, analyze.
//!
//! Everything here touches the filesystem and runs the engine, so handlers
//! call it through `spawn_blocking`. Each function works inside one run
//! directory and appends to that run's audit log.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use chrono::{Datelike, Utc};
use invrec_artifacts::{
    commit_artifacts, init_run_artifacts, report_bytes, update_manifest, write_artifact,
    InitRunArtifactsArgs, RunDir,
};
use invrec_audit::{events, AuditWriter};
use invrec_engine::{ReconcileOptions, ReconcileReport};
use invrec_records::{inspect_str, inventory_date, parse_str, FormatInspection, InventoryFile};
use invrec_template::{apply_completed_template, parse_completed_template, render_template};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::sessions::{SessionRecord, SessionStatus};

const DEFAULT_FILENAME: &str = "upload.csv";

/// Size and encoding checks, before any parsing.
pub fn validate_upload(body: &[u8], max_file_size: usize) -> Result<&str, ApiError> {
    if body.is_empty() {
        return Err(ApiError::EmptyUpload);
    }
    if body.len() > max_file_size {
        return Err(ApiError::TooLarge {
            size: body.len(),
            max: max_file_size,
        });
    }
    std::str::from_utf8(body).map_err(|_| ApiError::NotUtf8)
}

/// Keep only the last path component of a client-supplied name.
pub fn sanitize_filename(raw: Option<&str>) -> String {
    raw.and_then(|r| r.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or(DEFAULT_FILENAME)
        .to_string()
}

/// Parse the upload, open a run directory, store the input and the counting
/// template. A file that fails validation leaves nothing behind.
pub fn create_session(
    root: &Path,
    config_hash: &str,
    opts: &ReconcileOptions,
    filename: &str,
    text: &str,
) -> Result<SessionRecord, ApiError> {
    let file = parse_str(text, opts.delimiter)?;
    let template = render_template(&file, &opts.classifier)?;
    let template_rows = template.lines().count().saturating_sub(1);

    let id = Uuid::new_v4();
    let run = init_run_artifacts(InitRunArtifactsArgs {
        root,
        run_id: id,
        source_filename: filename,
        config_hash,
    })?;
    write_artifact(&run.input_path(), text)?;
    write_artifact(&run.template_path(), &template)?;

    let now = Utc::now();
    let rec = SessionRecord {
        id,
        status: SessionStatus::TemplateGenerated,
        original_filename: filename.to_string(),
        created_at_utc: now,
        updated_at_utc: now,
        last_accessed_utc: now,
        inventory_date: file
            .sessions
            .first()
            .and_then(|s| s.first_inventory_id())
            .and_then(|inv| inventory_date(inv, now.year())),
        session_ids: file
            .sessions
            .iter()
            .map(|s| s.session_id().to_string())
            .collect(),
        stock_lines: file.stock_line_count(),
        articles: distinct(&file, |l| l.article()),
        lots: distinct(&file, |l| l.lot()),
        total_theoretical: file
            .sessions
            .iter()
            .flat_map(|s| &s.lines)
            .map(|l| l.theoretical)
            .sum::<Decimal>(),
        template_rows,
        strategy: None,
        report: None,
        run_dir: run.dir.clone(),
    };

    let mut audit = AuditWriter::open(run.audit_path(), true)?;
    audit.append(
        id,
        events::TOPIC_SESSION,
        events::UPLOADED,
        json!({
            "filename": filename,
            "sessions": rec.session_ids,
            "stock_lines": rec.stock_lines,
            "inventory_date": rec.inventory_date,
        }),
    )?;
    audit.append(
        id,
        events::TOPIC_SESSION,
        events::TEMPLATE_RENDERED,
        json!({ "rows": template_rows }),
    )?;

    info!(
        session_id = %id,
        filename,
        stock_lines = rec.stock_lines,
        template_rows,
        "session created"
    );
    Ok(rec)
}

fn distinct(file: &InventoryFile, f: impl Fn(&invrec_records::StockLine) -> &str) -> usize {
    file.sessions
        .iter()
        .flat_map(|s| &s.lines)
        .map(f)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Apply a completed template to the stored input and reconcile. Writes the
/// completed template, report and final file into the run directory as one
/// step. On failure a FAILED event is appended and the previous artifacts
/// stay as they were.
pub fn process_session(
    run: &RunDir,
    opts: &ReconcileOptions,
    completed: &str,
) -> Result<ReconcileReport, ApiError> {
    let mut audit = AuditWriter::open(run.audit_path(), true)?;
    match process_inner(run, opts, completed, &mut audit) {
        Ok(report) => Ok(report),
        Err(e) => {
            audit.append(
                run.run_id,
                events::TOPIC_RECONCILE,
                events::FAILED,
                json!({ "error": e.to_string() }),
            )?;
            Err(e)
        }
    }
}

fn process_inner(
    run: &RunDir,
    opts: &ReconcileOptions,
    completed: &str,
    audit: &mut AuditWriter,
) -> Result<ReconcileReport, ApiError> {
    let input = std::fs::read_to_string(run.input_path())
        .with_context(|| format!("read stored input failed: {}", run.input_path().display()))?;
    let mut file = parse_str(&input, opts.delimiter)?;

    let rows = parse_completed_template(completed)?;
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

    let out = invrec_engine::reconcile(&file, opts)?;

    // Final file last: a final file on disk always has its report next to it.
    commit_artifacts(&[
        (run.completed_path(), completed.as_bytes().to_vec()),
        (run.report_path(), report_bytes(&out.report)?),
        (run.final_path(), out.text.clone().into_bytes()),
    ])?;
    update_manifest(run, |m| m.strategy = Some(opts.strategy.to_string()))?;
    audit.append(
        run.run_id,
        events::TOPIC_RECONCILE,
        events::RECONCILED,
        serde_json::to_value(&out.report).context("serialize report failed")?,
    )?;

    info!(
        session_id = %run.run_id,
        strategy = %opts.strategy,
        adjusted = out.report.adjusted_lines,
        synthesized = out.report.synthesized_lines,
        "session processed"
    );
    Ok(out.report)
}

pub fn analyze_session(
    run: &RunDir,
    delimiter: char,
    max_lines: usize,
) -> Result<FormatInspection, ApiError> {
    let input = std::fs::read_to_string(run.input_path())
        .with_context(|| format!("read stored input failed: {}", run.input_path().display()))?;
    Ok(inspect_str(&input, delimiter, max_lines))
}

pub fn read_artifact(path: &Path) -> Result<String, ApiError> {
    std::fs::read_to_string(path)
        .with_context(|| format!("read artifact failed: {}", path.display()))
        .map_err(ApiError::from)
}

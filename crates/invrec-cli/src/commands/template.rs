//! `invrec template render|apply`.

use anyhow::{Context, Result};
use invrec_records::parse_str;
use invrec_template::{apply_completed_template, parse_completed_template, render_template};

use super::{
    ensure_distinct_output, load_cli_config, print_report, read_text, write_report_json,
    write_text,
};

pub fn render(input: &str, output: &str, config_paths: &[String]) -> Result<()> {
    ensure_distinct_output(input, output)?;
    let cfg = load_cli_config(config_paths)?;
    let opts = cfg.options(None)?;

    let text = read_text(input, "input")?;
    let file = parse_str(&text, opts.delimiter).with_context(|| format!("parse failed: {input}"))?;
    let template = render_template(&file, &opts.classifier)?;
    write_text(output, &template, "template")?;

    println!("template={output}");
    println!("sessions={}", file.sessions.len());
    println!("rows={}", template.lines().count().saturating_sub(1));
    Ok(())
}

pub fn apply(
    input: &str,
    completed: &str,
    output: &str,
    strategy: Option<String>,
    config_paths: &[String],
    report_path: Option<String>,
) -> Result<()> {
    ensure_distinct_output(input, output)?;
    let cfg = load_cli_config(config_paths)?;
    let opts = cfg.options(strategy.as_deref())?;

    let text = read_text(input, "input")?;
    let mut file =
        parse_str(&text, opts.delimiter).with_context(|| format!("parse failed: {input}"))?;

    let rows = parse_completed_template(&read_text(completed, "completed template")?)
        .with_context(|| format!("completed template rejected: {completed}"))?;
    let summaries = apply_completed_template(&mut file, &rows, opts.strategy, &opts.classifier)
        .with_context(|| format!("count distribution failed: {completed}"))?;

    let out = invrec_engine::reconcile(&file, &opts).context("reconcile failed")?;
    write_text(output, &out.text, "output")?;
    if let Some(p) = &report_path {
        write_report_json(p, &out.report)?;
    }

    println!("output={output}");
    println!("config_hash={}", cfg.loaded.config_hash);
    println!("template_rows={}", rows.len());
    println!(
        "aggregates={}",
        summaries.iter().map(|s| s.aggregates).sum::<usize>()
    );
    print_report(&out.report);
    Ok(())
}

//! `invrec reconcile` and `invrec inspect`.

use anyhow::{Context, Result};
use std::path::Path;

use super::{
    ensure_distinct_output, load_cli_config, print_report, read_text, write_report_json,
    write_text,
};

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

pub fn reconcile(
    input: &str,
    output: &str,
    strategy: Option<String>,
    config_paths: &[String],
    report_path: Option<String>,
) -> Result<()> {
    ensure_distinct_output(input, output)?;
    let cfg = load_cli_config(config_paths)?;
    let opts = cfg.options(strategy.as_deref())?;

    // Nothing is written unless the whole file reconciles.
    let out = invrec_engine::reconcile_file(Path::new(input), &opts)
        .with_context(|| format!("reconcile failed: {input}"))?;

    write_text(output, &out.text, "output")?;
    if let Some(p) = &report_path {
        write_report_json(p, &out.report)?;
    }

    println!("output={output}");
    println!("config_hash={}", cfg.loaded.config_hash);
    print_report(&out.report);
    if let Some(p) = report_path {
        println!("report={p}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

pub fn inspect(input: &str, lines: usize, config_paths: &[String]) -> Result<()> {
    let cfg = load_cli_config(config_paths)?;
    let delimiter = cfg.settings.delimiter()?;
    let text = read_text(input, "input")?;

    let r = invrec_records::inspect_str(&text, delimiter, lines);
    println!("total_lines={}", r.total_lines);
    println!("e_lines={}", join(&r.e_lines));
    println!("l_lines={}", join(&r.l_lines));
    println!("s_lines={}", join(&r.s_lines));
    println!("columns_per_line={}", join(&r.columns_per_line));
    println!("expected_stock_columns={}", r.expected_stock_columns);
    println!("stock_lines_well_formed={}", r.stock_lines_well_formed());
    println!("stock_column_names={}", r.stock_column_names.join(","));
    Ok(())
}

fn join(v: &[usize]) -> String {
    v.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")
}

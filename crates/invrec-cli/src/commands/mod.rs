//! Command handler modules for invrec-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod reconcile;
pub mod run;
pub mod template;

use anyhow::{anyhow, bail, Context, Result};
use invrec_config::{
    report_unused_keys, ConfigSurface, LoadedConfig, ReconcileConfig, UnusedKeyPolicy,
};
use invrec_engine::{AllocationStrategy, ReconcileOptions, ReconcileReport};
use std::fs;
use std::path::Path;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub struct CliConfig {
    pub loaded: LoadedConfig,
    pub settings: ReconcileConfig,
}

impl CliConfig {
    /// Engine options, with `--strategy` taking precedence over the config.
    pub fn options(&self, strategy: Option<&str>) -> Result<ReconcileOptions> {
        let opts = ReconcileOptions::from_config(&self.settings)
            .context("config cannot be turned into engine options")?;
        match strategy {
            Some(s) => Ok(opts.with_strategy(parse_strategy(s)?)),
            None => Ok(opts),
        }
    }
}

/// Load layered config for the CLI surface. No paths means all defaults.
/// Unused keys are warned about, never fatal, on the CLI.
pub fn load_cli_config(config_paths: &[String]) -> Result<CliConfig> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = invrec_config::load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(ConfigSurface::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS surface={} unused_leaf_keys={}",
            report.surface,
            report.unused_leaf_pointers.len()
        );
    }

    let settings = loaded.settings()?;
    Ok(CliConfig { loaded, settings })
}

pub fn parse_strategy(s: &str) -> Result<AllocationStrategy> {
    s.parse::<AllocationStrategy>()
        .map_err(|e| anyhow!("invalid --strategy: {e}"))
}

/// Refuse to write the result over the file it was computed from.
pub fn ensure_distinct_output(input: &str, output: &str) -> Result<()> {
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => Path::new(input) == Path::new(output),
    };
    if same {
        bail!("--output must differ from --input ({output})");
    }
    Ok(())
}

pub fn read_text(path: &str, what: &str) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {what} failed: {path}"))?;
    String::from_utf8(bytes).with_context(|| format!("{what} must be UTF-8 text: {path}"))
}

pub fn write_text(path: &str, text: &str, what: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("write {what} failed: {path}"))
}

pub fn write_report_json(path: &str, report: &ReconcileReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report failed")?;
    write_text(path, &format!("{json}\n"), "report")
}

pub fn print_report(report: &ReconcileReport) {
    for line in report.to_kv_lines() {
        println!("{line}");
    }
}

//! Unused-key guard.
//!
//! Each surface (CLI, daemon) declares the JSON-pointer prefixes it actually
//! reads. A leaf under a consumed prefix is consumed; every other leaf is
//! reported as unused, which catches typos such as `lots.year_pivto` that
//! would otherwise silently fall back to a default.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSurface {
    Cli,
    Daemon,
}

impl ConfigSurface {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSurface::Cli => "CLI",
            ConfigSurface::Daemon => "DAEMON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub surface: String,
    /// Consumed prefixes used for this analysis (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Pointers read by `ReconcileConfig` on each surface. Must match what the
/// binaries actually read.
pub fn consumed_pointers_for_surface(surface: ConfigSurface) -> &'static [&'static str] {
    match surface {
        ConfigSurface::Cli => &[
            "/engine/strategy",
            "/engine/lotecart_token",
            "/lots/site_prefix_len",
            "/lots/tier2_prefixes",
            "/lots/year_pivot",
            "/files/delimiter",
            "/storage/root",
        ],
        ConfigSurface::Daemon => &[
            "/engine/strategy",
            "/engine/lotecart_token",
            "/lots/site_prefix_len",
            "/lots/tier2_prefixes",
            "/lots/year_pivot",
            "/files/delimiter",
            "/files/max_file_size",
            "/storage/root",
            "/sessions/expiry_hours",
        ],
    }
}

/// `Warn` always returns the report; `Fail` errors when any key is unused.
pub fn report_unused_keys(
    surface: ConfigSurface,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = consumed_pointers_for_surface(surface)
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        surface: surface.as_str().to_string(),
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if !report.is_clean() {
        match policy {
            UnusedKeyPolicy::Fail => bail!(
                "CONFIG_UNUSED_KEYS (surface={}): {} unused config leaf key(s): {}",
                report.surface,
                report.unused_leaf_pointers.len(),
                preview_list(&report.unused_leaf_pointers, 12)
            ),
            UnusedKeyPolicy::Warn => {
                for p in &report.unused_leaf_pointers {
                    tracing::warn!(surface = %report.surface, pointer = %p, "unused config key");
                }
            }
        }
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, vv) in map {
                collect_leaf_pointers(vv, &format!("{prefix}/{}", escape_token(k)), out);
            }
        }
        Value::Object(_) => {}
        // Arrays are leaves: `/lots/tier2_prefixes` is one setting.
        _ => out.push(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
    }
}

fn escape_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn preview_list(items: &[String], n: usize) -> String {
    format!("{:?}", items.iter().take(n).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_boundary_respected() {
        assert!(is_prefix_pointer("/lots", "/lots/year_pivot"));
        assert!(is_prefix_pointer("/lots/year_pivot", "/lots/year_pivot"));
        assert!(!is_prefix_pointer("/lots/year", "/lots/year_pivot"));
        assert!(is_prefix_pointer("/", "/anything"));
    }

    #[test]
    fn pointer_tokens_escaped() {
        let v = serde_json::json!({"a/b": {"c~d": 1}});
        let mut out = Vec::new();
        collect_leaf_pointers(&v, "", &mut out);
        assert_eq!(out, vec!["/a~1b/c~0d".to_string()]);
    }

    #[test]
    fn empty_object_has_no_leaves() {
        let mut out = Vec::new();
        collect_leaf_pointers(&serde_json::json!({}), "", &mut out);
        assert!(out.is_empty());
    }
}

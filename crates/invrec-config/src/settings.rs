//! Typed view of the merged configuration document.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReconcileConfig {
    pub engine: EngineSettings,
    pub lots: LotSettings,
    pub files: FileSettings,
    pub storage: StorageSettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// `FIFO` or `LIFO`, case-insensitive.
    pub strategy: String,
    /// Lot identifier written on synthesized lines.
    pub lotecart_token: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy: "FIFO".to_string(),
            lotecart_token: "LOTECART".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotSettings {
    /// Width of the alphabetic site prefix in Tier 1 identifiers.
    pub site_prefix_len: usize,
    /// Literal prefixes of Tier 2 identifiers, tried in order.
    pub tier2_prefixes: Vec<String>,
    /// Two-digit years below the pivot are 20xx, the others 19xx.
    pub year_pivot: u32,
}

impl Default for LotSettings {
    fn default() -> Self {
        Self {
            site_prefix_len: 4,
            tier2_prefixes: vec!["LOT".to_string()],
            year_pivot: 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub max_file_size: u64,
    pub delimiter: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            delimiter: ";".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub root: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: "data/runs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub expiry_hours: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { expiry_hours: 24 }
    }
}

impl ReconcileConfig {
    /// Deserialize and validate. Unknown keys are ignored here; see
    /// [`crate::report_unused_keys`].
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let cfg: ReconcileConfig = if v.is_null() {
            ReconcileConfig::default()
        } else {
            serde_json::from_value(v.clone()).context("config does not match expected shape")?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let strategy = self.engine.strategy.to_ascii_uppercase();
        if strategy != "FIFO" && strategy != "LIFO" {
            bail!(
                "CONFIG_INVALID engine.strategy='{}' (expected FIFO or LIFO)",
                self.engine.strategy
            );
        }
        if self.engine.lotecart_token.trim().is_empty() {
            bail!("CONFIG_INVALID engine.lotecart_token must not be empty");
        }
        if self.lots.site_prefix_len == 0 {
            bail!("CONFIG_INVALID lots.site_prefix_len must be at least 1");
        }
        if self.lots.tier2_prefixes.iter().any(|p| p.is_empty()) {
            bail!("CONFIG_INVALID lots.tier2_prefixes must not contain empty prefixes");
        }
        if self.lots.year_pivot > 100 {
            bail!(
                "CONFIG_INVALID lots.year_pivot={} (expected 0..=100)",
                self.lots.year_pivot
            );
        }
        if self.files.max_file_size == 0 {
            bail!("CONFIG_INVALID files.max_file_size must be positive");
        }
        self.delimiter()?;
        Ok(())
    }

    /// The record delimiter as a single character.
    pub fn delimiter(&self) -> Result<char> {
        let mut chars = self.files.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '\n' && c != '\r' => Ok(c),
            _ => bail!(
                "CONFIG_INVALID files.delimiter='{}' (expected one character)",
                self.files.delimiter
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_document_gives_defaults() {
        let cfg = ReconcileConfig::from_config_json(&Value::Null).unwrap();
        assert_eq!(cfg, ReconcileConfig::default());
        assert_eq!(cfg.delimiter().unwrap(), ';');
    }

    #[test]
    fn multi_char_delimiter_rejected() {
        let mut cfg = ReconcileConfig::default();
        cfg.files.delimiter = ";;".to_string();
        assert!(cfg.validate().is_err());
        cfg.files.delimiter = String::new();
        assert!(cfg.validate().is_err());
    }
}

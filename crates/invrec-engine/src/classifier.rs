//! Lot Classifier.
//!
//! An ordered list of rules, first match wins. Each rule is a pattern whose
//! three capture groups are the DDMMYY block of the lot date. Adding a lot
//! format means adding a rule; nothing downstream changes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use invrec_config::LotSettings;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

pub const DEFAULT_LOTECART_TOKEN: &str = "LOTECART";

/// Priority tier. Lower wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LotTier {
    Tier1,
    Tier2,
    Unmatched,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LotClassification {
    pub tier: LotTier,
    pub date: Option<NaiveDate>,
    /// The identifier is the reserved synthesized-lot token.
    pub is_special: bool,
    /// A rule matched but its date block was not a calendar date.
    pub degraded: bool,
}

impl LotClassification {
    fn unmatched() -> Self {
        Self {
            tier: LotTier::Unmatched,
            date: None,
            is_special: false,
            degraded: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Allocation strategy
// ---------------------------------------------------------------------------

/// Date order used when two lots share a tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AllocationStrategy {
    /// Earliest date first.
    #[default]
    Fifo,
    /// Latest date first.
    Lifo,
}

impl AllocationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStrategy::Fifo => "FIFO",
            AllocationStrategy::Lifo => "LIFO",
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(AllocationStrategy::Fifo),
            "LIFO" => Ok(AllocationStrategy::Lifo),
            other => Err(format!("unknown allocation strategy '{other}' (expected FIFO or LIFO)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct LotRule {
    tier: LotTier,
    pattern: Regex,
}

#[derive(Clone, Debug)]
pub struct LotClassifier {
    rules: Vec<LotRule>,
    year_pivot: u32,
    special_token: String,
}

impl LotClassifier {
    /// Tier 1: `<site_prefix_len letters><DDMMYY><alphanumeric sequence>`.
    /// Tier 2: `<one of tier2_prefixes><DDMMYY>`, optional alphanumeric tail.
    pub fn new(
        site_prefix_len: usize,
        tier2_prefixes: &[String],
        year_pivot: u32,
        special_token: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let mut rules = vec![LotRule {
            tier: LotTier::Tier1,
            pattern: Regex::new(&format!(
                r"^[A-Za-z]{{{site_prefix_len}}}(\d{{2}})(\d{{2}})(\d{{2}})[A-Za-z0-9]+$"
            ))?,
        }];
        if !tier2_prefixes.is_empty() {
            let alts: Vec<String> = tier2_prefixes.iter().map(|p| regex::escape(p)).collect();
            rules.push(LotRule {
                tier: LotTier::Tier2,
                pattern: Regex::new(&format!(
                    r"^(?:{})(\d{{2}})(\d{{2}})(\d{{2}})[A-Za-z0-9]*$",
                    alts.join("|")
                ))?,
            });
        }
        Ok(Self {
            rules,
            year_pivot,
            special_token: special_token.into(),
        })
    }

    pub fn from_settings(lots: &LotSettings, special_token: &str) -> Result<Self, regex::Error> {
        Self::new(
            lots.site_prefix_len,
            &lots.tier2_prefixes,
            lots.year_pivot,
            special_token,
        )
    }

    pub fn special_token(&self) -> &str {
        &self.special_token
    }

    pub fn is_special(&self, lot: &str) -> bool {
        lot.trim() == self.special_token
    }

    /// Never fails. Empty identifiers and unknown formats are `Unmatched`.
    pub fn classify(&self, lot: &str) -> LotClassification {
        let lot = lot.trim();
        if lot == self.special_token {
            return LotClassification {
                is_special: true,
                ..LotClassification::unmatched()
            };
        }
        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(lot) else {
                continue;
            };
            return match self.ddmmyy(&caps[1], &caps[2], &caps[3]) {
                Some(date) => LotClassification {
                    tier: rule.tier,
                    date: Some(date),
                    is_special: false,
                    degraded: false,
                },
                None => LotClassification {
                    degraded: true,
                    ..LotClassification::unmatched()
                },
            };
        }
        LotClassification::unmatched()
    }

    fn ddmmyy(&self, dd: &str, mm: &str, yy: &str) -> Option<NaiveDate> {
        let day: u32 = dd.parse().ok()?;
        let month: u32 = mm.parse().ok()?;
        let yy: u32 = yy.parse().ok()?;
        let year = if yy < self.year_pivot { 2000 + yy } else { 1900 + yy };
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    }

    /// Total order over lots: tier, then date per `strategy` (undated after
    /// dated), then raw identifier. Reserved-token lots sort after all others.
    pub fn compare(&self, a: &str, b: &str, strategy: AllocationStrategy) -> Ordering {
        let (ca, cb) = (self.classify(a), self.classify(b));
        ca.is_special
            .cmp(&cb.is_special)
            .then(ca.tier.cmp(&cb.tier))
            .then(compare_dates(ca.date, cb.date, strategy))
            .then_with(|| a.trim().cmp(b.trim()))
    }
}

impl Default for LotClassifier {
    /// Default lot settings. Should the patterns ever fail to build, every lot
    /// ranks as unmatched and the failure is logged.
    fn default() -> Self {
        let lots = LotSettings::default();
        Self::from_settings(&lots, DEFAULT_LOTECART_TOKEN).unwrap_or_else(|e| {
            error!(error = %e, "default lot patterns rejected; lots rank as unmatched");
            Self {
                rules: Vec::new(),
                year_pivot: lots.year_pivot,
                special_token: DEFAULT_LOTECART_TOKEN.to_string(),
            }
        })
    }
}

pub(crate) fn compare_dates(
    a: Option<NaiveDate>,
    b: Option<NaiveDate>,
    strategy: AllocationStrategy,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match strategy {
            AllocationStrategy::Fifo => x.cmp(&y),
            AllocationStrategy::Lifo => y.cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

//! Counting aggregates: the lines an operator counts as one physical pile.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use invrec_records::{Session, StockLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classifier::compare_dates;
use crate::{AllocationStrategy, LotClassifier};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateKey {
    pub article: String,
    pub stock_status: String,
    pub location: String,
    pub zone: String,
    pub unit: String,
}

impl AggregateKey {
    /// Fields are trimmed: fixed-width exports pad them, and the counting
    /// template carries them back without the padding.
    pub fn of(line: &StockLine) -> Self {
        Self {
            article: line.article().trim().to_string(),
            stock_status: line.stock_status().trim().to_string(),
            location: line.location().trim().to_string(),
            zone: line.zone().trim().to_string(),
            unit: line.unit().trim().to_string(),
        }
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(article={} status={} location={} zone={} unit={})",
            self.article, self.stock_status, self.location, self.zone, self.unit
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub key: AggregateKey,
    pub session_id: String,
    /// Inventory list and site of the first member line.
    pub inventory_id: String,
    pub site: String,
    pub theoretical_total: Decimal,
    pub earliest_lot_date: Option<NaiveDate>,
    /// Session line indexes, in file order.
    pub members: Vec<usize>,
}

/// Aggregates of one session, earliest lot date first (undated last), then
/// by key.
pub fn aggregate_session(session: &Session, classifier: &LotClassifier) -> Vec<Aggregate> {
    let mut by_key: BTreeMap<AggregateKey, Aggregate> = BTreeMap::new();
    for (i, line) in session.lines.iter().enumerate() {
        let key = AggregateKey::of(line);
        let date = classifier.classify(line.lot()).date;
        let agg = by_key.entry(key.clone()).or_insert_with(|| Aggregate {
            key,
            session_id: session.session_id().to_string(),
            inventory_id: line.inventory_id().to_string(),
            site: line.site().to_string(),
            theoretical_total: Decimal::ZERO,
            earliest_lot_date: None,
            members: Vec::new(),
        });
        agg.theoretical_total += line.theoretical;
        agg.earliest_lot_date = match (agg.earliest_lot_date, date) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        agg.members.push(i);
    }

    let mut out: Vec<Aggregate> = by_key.into_values().collect();
    out.sort_by(|a, b| {
        compare_dates(a.earliest_lot_date, b.earliest_lot_date, AllocationStrategy::Fifo)
            .then_with(|| a.key.cmp(&b.key))
    });
    out
}

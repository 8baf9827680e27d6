use std::collections::BTreeMap;

use invrec_engine::{
    distribute_counts, AggregateKey, AllocationStrategy, DistributionSummary, LotClassifier,
};
use invrec_records::{parse_quantity, InventoryFile, QuantityError};
use rust_decimal::Decimal;
use tracing::info;

use crate::{TemplateError, TEMPLATE_COLUMNS};

/// One filled-in template row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedCount {
    pub row: u64,
    pub session_id: String,
    pub key: AggregateKey,
    pub counted: Decimal,
}

/// Parse a completed template. Columns are found by header name, so the
/// operator may reorder them or add columns of their own. Every row needs a
/// non-negative count.
pub fn parse_completed_template(text: &str) -> Result<Vec<CompletedCount>, TemplateError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let mut idx = [0usize; TEMPLATE_COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(TEMPLATE_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(TemplateError::MissingColumn(name))?;
    }
    let [session_id, _inventory_id, article, stock_status, _theoretical, counted, unit, zone, location] =
        idx;

    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let row = rec.position().map(|p| p.line()).unwrap_or(0);
        if rec.iter().all(str::is_empty) {
            continue;
        }
        let field = |i: usize| rec.get(i).unwrap_or("").to_string();

        let raw = field(counted);
        let value = match parse_quantity(&raw) {
            Ok(v) if v < Decimal::ZERO => return Err(TemplateError::NegativeCount { row, value: v }),
            Ok(v) => v,
            Err(QuantityError::Empty) => return Err(TemplateError::EmptyCount { row }),
            Err(QuantityError::Invalid(raw)) => {
                return Err(TemplateError::InvalidCount { row, raw })
            }
        };

        out.push(CompletedCount {
            row,
            session_id: field(session_id),
            key: AggregateKey {
                article: field(article),
                stock_status: field(stock_status),
                location: field(location),
                zone: field(zone),
                unit: field(unit),
            },
            counted: value,
        });
    }

    if out.is_empty() {
        return Err(TemplateError::Empty);
    }
    Ok(out)
}

/// Distribute completed counts onto the lines of `file`, session by session.
/// Either every session distributes or the file is left as it was.
pub fn apply_completed_template(
    file: &mut InventoryFile,
    counts: &[CompletedCount],
    strategy: AllocationStrategy,
    classifier: &LotClassifier,
) -> Result<Vec<DistributionSummary>, TemplateError> {
    let mut per_session: BTreeMap<&str, BTreeMap<AggregateKey, Decimal>> = BTreeMap::new();
    for c in counts {
        if file.session(&c.session_id).is_none() {
            return Err(TemplateError::UnknownSession {
                row: c.row,
                session_id: c.session_id.clone(),
            });
        }
        let slot = per_session.entry(c.session_id.as_str()).or_default();
        if slot.insert(c.key.clone(), c.counted).is_some() {
            return Err(TemplateError::DuplicateRow {
                row: c.row,
                session_id: c.session_id.clone(),
                aggregate: c.key.to_string(),
            });
        }
    }

    let empty = BTreeMap::new();
    let mut staged = file.clone();
    let mut summaries = Vec::with_capacity(staged.sessions.len());
    for session in &mut staged.sessions {
        let session_counts = per_session
            .get(session.session_id().trim())
            .unwrap_or(&empty);
        summaries.push(distribute_counts(
            session,
            session_counts,
            strategy,
            classifier,
        )?);
    }
    *file = staged;

    info!(
        sessions = summaries.len(),
        rows = counts.len(),
        %strategy,
        "completed template applied"
    );
    Ok(summaries)
}

//! Count distribution: one counted total per aggregate, spread over the
//! aggregate's lines in lot-ranking order.

use std::collections::BTreeMap;

use invrec_records::{Session, ValidationError, ValidationKind};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{aggregate_session, AggregateKey, AllocationStrategy, EngineError, LotClassifier};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DistributionSummary {
    pub aggregates: usize,
    pub lines: usize,
    pub counted_total: Decimal,
}

/// Overwrite the counted quantity of every line of `session` from per
/// aggregate totals. Every aggregate needs a count and every count needs an
/// aggregate. Nothing is written unless the whole session distributes.
pub fn distribute_counts(
    session: &mut Session,
    counts: &BTreeMap<AggregateKey, Decimal>,
    strategy: AllocationStrategy,
    classifier: &LotClassifier,
) -> Result<DistributionSummary, EngineError> {
    let sid = session.session_id().to_string();
    let aggregates = aggregate_session(session, classifier);

    if let Some(unknown) = counts
        .keys()
        .find(|k| !aggregates.iter().any(|a| &a.key == *k))
    {
        return Err(EngineError::UnknownAggregate {
            session_id: sid,
            aggregate: unknown.to_string(),
        });
    }

    let mut planned: Vec<(usize, Decimal)> = Vec::with_capacity(session.lines.len());
    let mut summary = DistributionSummary::default();
    for agg in &aggregates {
        let Some(&counted) = counts.get(&agg.key) else {
            return Err(EngineError::MissingAggregateCount {
                session_id: sid,
                aggregate: agg.key.to_string(),
            });
        };
        if counted < Decimal::ZERO {
            let first = &session.lines[agg.members[0]];
            return Err(ValidationError::new(
                first.line_or_zero(),
                ValidationKind::NegativeQuantity {
                    field: "counted",
                    value: counted,
                },
            )
            .in_session(sid)
            .into());
        }

        let mut ranked = agg.members.clone();
        ranked.sort_by(|&a, &b| {
            classifier
                .compare(session.lines[a].lot(), session.lines[b].lot(), strategy)
                .then(a.cmp(&b))
        });
        let per_line = split_count(session, &ranked, agg.theoretical_total, counted);

        let total: Decimal = per_line.iter().map(|(_, q)| *q).sum();
        if total != counted {
            error!(
                session_id = %sid,
                aggregate = %agg.key,
                %total,
                %counted,
                "distributed counts do not add up"
            );
            return Err(EngineError::Consistency {
                session_id: sid,
                article: agg.key.article.clone(),
                site: agg.site.clone(),
                adjusted_total: total,
                counted_total: counted,
            });
        }
        debug!(session_id = %sid, aggregate = %agg.key, %counted, lines = per_line.len(), "count distributed");

        summary.aggregates += 1;
        summary.lines += per_line.len();
        summary.counted_total += counted;
        planned.extend(per_line);
    }

    for (i, q) in planned {
        session.lines[i].set_count(q);
    }
    info!(
        session_id = %sid,
        aggregates = summary.aggregates,
        lines = summary.lines,
        "counts distributed"
    );
    Ok(summary)
}

/// Each line starts at its theoretical quantity. A surplus goes to the first
/// ranked line; a deficit is taken from lines in rank order, none below zero.
fn split_count(
    session: &Session,
    ranked: &[usize],
    theoretical_total: Decimal,
    counted: Decimal,
) -> Vec<(usize, Decimal)> {
    let mut out: Vec<(usize, Decimal)> = ranked
        .iter()
        .map(|&i| (i, session.lines[i].theoretical))
        .collect();

    let delta = counted - theoretical_total;
    if delta > Decimal::ZERO {
        if let Some((_, q)) = out.first_mut() {
            *q += delta;
        }
    } else if delta < Decimal::ZERO {
        let mut deficit = -delta;
        for (_, q) in out.iter_mut() {
            if deficit.is_zero() {
                break;
            }
            let take = (*q).min(deficit);
            *q -= take;
            deficit -= take;
        }
    }
    out
}

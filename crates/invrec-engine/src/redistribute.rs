//! Redistribution Engine.
//!
//! Works on one article group at a time. Ordinary lines are settled by their
//! own (theoretical, counted) pair. Lines with nothing expected and something
//! counted but no lot identifier cannot stay lot-less: each one is booked onto
//! the lot chosen by ranking, or, when the group has no such lot, re-emitted
//! as its own reserved-token line after the last line of its inventory list.
//!
//! Either way the line comes out with adjusted == counted, so a second run
//! over the output finds nothing left to move.
//!
//! The group invariant `sum(adjusted) == sum(counted)` is checked before
//! anything is returned.

use invrec_records::{
    col, set_field, LineOrigin, Session, StockLine, ValidationError, ValidationKind,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    compute, AllocationStrategy, ArticleKey, DiscrepancyKind, EngineError, Indicator,
    LotClassifier,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Disposition {
    /// Settled by the line's own quantities.
    InPlace,
    /// Lot-less line booked onto the best-ranked lot of its group.
    Relotted,
    /// Lot-less line with no lot to take; emitted as a synthesized line
    /// instead of at its own position.
    Moved,
    /// Created by the engine.
    Synthesized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjustment {
    pub adjusted: Decimal,
    pub indicator: Indicator,
    pub disposition: Disposition,
    pub kind: DiscrepancyKind,
    /// Written into the empty lot field of a relotted line.
    pub lot: Option<String>,
}

impl Adjustment {
    fn in_place(adjusted: Decimal, indicator: Indicator, kind: DiscrepancyKind) -> Self {
        Self {
            adjusted,
            indicator,
            disposition: Disposition::InPlace,
            kind,
            lot: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesizedLine {
    /// Session line index of the lot-less line this replaces.
    pub source: usize,
    /// Session line index after which this line is emitted: the last line of
    /// the source line's inventory list.
    pub after: usize,
    pub line: StockLine,
    pub adjustment: Adjustment,
}

#[derive(Clone, Debug, Default)]
pub struct GroupOutcome {
    /// One entry per member, in member order.
    pub adjustments: Vec<(usize, Adjustment)>,
    pub synthesized: Vec<SynthesizedLine>,
    pub degraded_lots: Vec<String>,
}

pub fn redistribute(
    session: &Session,
    key: &ArticleKey,
    members: &[usize],
    classifier: &LotClassifier,
    strategy: AllocationStrategy,
) -> Result<GroupOutcome, EngineError> {
    let sid = session.session_id();
    let mut adjustments: Vec<(usize, Adjustment)> = Vec::with_capacity(members.len());
    let mut degraded_lots = Vec::new();
    // Positions in `adjustments` of lot-less surplus lines.
    let mut unanchored: Vec<usize> = Vec::new();
    let mut counted_total = Decimal::ZERO;

    for &i in members {
        let line = &session.lines[i];
        let invalid = |kind: ValidationKind| {
            ValidationError::new(line.line_or_zero(), kind)
                .in_session(sid)
                .at_lot(line.article(), line.lot())
        };
        let counted = line
            .counted
            .ok_or_else(|| invalid(ValidationKind::MissingCount))?;
        let d = compute(line.theoretical, counted).map_err(invalid)?;
        counted_total += counted;

        let lot = line.lot();
        if !lot.is_empty() && classifier.classify(lot).degraded {
            warn!(
                session_id = sid,
                article = line.article(),
                lot,
                line = line.line_or_zero(),
                "lot date is not a calendar date; ranked as unmatched"
            );
            degraded_lots.push(lot.to_string());
        }

        if d.needs_lot_synthesis() && lot.is_empty() {
            unanchored.push(adjustments.len());
        }
        adjustments.push((i, Adjustment::in_place(d.adjusted, d.indicator, d.kind)));
    }

    let mut synthesized = Vec::new();
    if !unanchored.is_empty() {
        match pick_receiver(session, &adjustments, classifier, strategy) {
            Some(p) => {
                let receiver_lot = session.lines[adjustments[p].0].lot().to_string();
                for &u in &unanchored {
                    let (idx, adj) = &mut adjustments[u];
                    adj.disposition = Disposition::Relotted;
                    adj.lot = Some(receiver_lot.clone());
                    debug!(
                        session_id = sid,
                        article = %key.article,
                        site = %key.site,
                        line = session.lines[*idx].line_or_zero(),
                        lot = %receiver_lot,
                        counted = %adj.adjusted,
                        "lot-less count booked onto existing lot"
                    );
                }
            }
            None => {
                for &u in &unanchored {
                    let (idx, adj) = &mut adjustments[u];
                    let s = synthesize(session, *idx, adj.adjusted, classifier.special_token());
                    adj.adjusted = Decimal::ZERO;
                    adj.indicator = Indicator::Unchanged;
                    adj.disposition = Disposition::Moved;
                    debug!(
                        session_id = sid,
                        article = %key.article,
                        site = %key.site,
                        line = session.lines[*idx].line_or_zero(),
                        counted = %s.adjustment.adjusted,
                        "lot-less count placed on synthesized lot"
                    );
                    synthesized.push(s);
                }
            }
        }
    }

    let adjusted_total: Decimal = adjustments
        .iter()
        .map(|(_, a)| a.adjusted)
        .chain(synthesized.iter().map(|s| s.adjustment.adjusted))
        .sum();
    if adjusted_total != counted_total {
        error!(
            session_id = sid,
            article = %key.article,
            site = %key.site,
            %adjusted_total,
            %counted_total,
            "article group does not balance"
        );
        return Err(EngineError::Consistency {
            session_id: sid.to_string(),
            article: key.article.clone(),
            site: key.site.clone(),
            adjusted_total,
            counted_total,
        });
    }

    Ok(GroupOutcome {
        adjustments,
        synthesized,
        degraded_lots,
    })
}

/// Position (in `adjustments`) of the line whose lot takes the lot-less
/// counts. First choice: best-ranked zero-theoretical line with a real lot.
/// Second: the first zero-theoretical reserved-token line.
fn pick_receiver(
    session: &Session,
    adjustments: &[(usize, Adjustment)],
    classifier: &LotClassifier,
    strategy: AllocationStrategy,
) -> Option<usize> {
    let line = |p: usize| &session.lines[adjustments[p].0];

    let real_lot = (0..adjustments.len())
        .filter(|&p| {
            let l = line(p);
            l.theoretical.is_zero() && !l.lot().is_empty() && !classifier.is_special(l.lot())
        })
        .min_by(|&a, &b| {
            classifier
                .compare(line(a).lot(), line(b).lot(), strategy)
                .then(adjustments[a].0.cmp(&adjustments[b].0))
        });

    real_lot.or_else(|| {
        (0..adjustments.len()).find(|&p| {
            let l = line(p);
            l.theoretical.is_zero() && classifier.is_special(l.lot())
        })
    })
}

/// Reserved-token copy of a lot-less line. Every other field, rank and
/// counted value included, is the source's.
fn synthesize(session: &Session, source: usize, counted: Decimal, token: &str) -> SynthesizedLine {
    let src = &session.lines[source];
    let after = session
        .lines
        .iter()
        .rposition(|l| l.inventory_id() == src.inventory_id())
        .unwrap_or(source);

    let mut fields = src.fields.clone();
    set_field(&mut fields, col::LOT, token);

    SynthesizedLine {
        source,
        after,
        line: StockLine {
            origin: LineOrigin::Synthesized,
            fields,
            theoretical: src.theoretical,
            counted: src.counted,
        },
        adjustment: Adjustment {
            adjusted: counted,
            indicator: Indicator::Adjusted,
            disposition: Disposition::Synthesized,
            kind: DiscrepancyKind::SurplusOnEmpty,
            lot: None,
        },
    }
}

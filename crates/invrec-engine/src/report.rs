use rust_decimal::Decimal;
use serde::Serialize;

use invrec_records::Session;

use crate::{AllocationStrategy, Disposition, DiscrepancyKind, Indicator, SessionOutcome};

/// Run statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub strategy: AllocationStrategy,
    pub sessions: usize,
    pub session_ids: Vec<String>,
    /// Parsed stock lines.
    pub stock_lines: usize,
    pub unchanged_lines: usize,
    pub adjusted_lines: usize,
    /// Theoretical 0, counted 0.
    pub inert_lines: usize,
    /// Lot-less lines booked onto an existing lot of their group.
    pub relotted_lines: usize,
    /// Lot-less lines re-emitted under the reserved token.
    pub synthesized_lines: usize,
    /// Sum of |adjusted - theoretical| over every emitted line.
    pub total_abs_discrepancy: Decimal,
    /// Lot identifiers whose date block was not a calendar date (sorted,
    /// unique).
    pub degraded_lots: Vec<String>,
}

impl ReconcileReport {
    pub fn new(strategy: AllocationStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn record_session(&mut self, session: &Session, outcome: &SessionOutcome) {
        self.sessions += 1;
        self.session_ids.push(session.session_id().to_string());
        for (adj, line) in outcome.adjustments.iter().zip(&session.lines) {
            self.stock_lines += 1;
            if adj.disposition == Disposition::Moved {
                // Counted through its synthesized line below.
                continue;
            }
            match adj.indicator {
                Indicator::Unchanged => self.unchanged_lines += 1,
                Indicator::Adjusted => self.adjusted_lines += 1,
            }
            if adj.kind == DiscrepancyKind::Inert && adj.disposition == Disposition::InPlace {
                self.inert_lines += 1;
            }
            if adj.disposition == Disposition::Relotted {
                self.relotted_lines += 1;
            }
            self.total_abs_discrepancy += (adj.adjusted - line.theoretical).abs();
        }
        for s in &outcome.synthesized {
            self.synthesized_lines += 1;
            match s.adjustment.indicator {
                Indicator::Unchanged => self.unchanged_lines += 1,
                Indicator::Adjusted => self.adjusted_lines += 1,
            }
            self.total_abs_discrepancy += (s.adjustment.adjusted - s.line.theoretical).abs();
        }
        self.degraded_lots.extend(outcome.degraded_lots.iter().cloned());
        self.degraded_lots.sort();
        self.degraded_lots.dedup();
    }

    /// `key=value` lines, one per statistic.
    pub fn to_kv_lines(&self) -> Vec<String> {
        vec![
            format!("strategy={}", self.strategy),
            format!("sessions={}", self.sessions),
            format!("stock_lines={}", self.stock_lines),
            format!("unchanged_lines={}", self.unchanged_lines),
            format!("adjusted_lines={}", self.adjusted_lines),
            format!("inert_lines={}", self.inert_lines),
            format!("relotted_lines={}", self.relotted_lines),
            format!("synthesized_lines={}", self.synthesized_lines),
            format!("total_abs_discrepancy={}", self.total_abs_discrepancy),
            format!("degraded_lots={}", self.degraded_lots.join(",")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{reconcile_str, ReconcileOptions};

    #[test]
    fn json_and_kv_forms() {
        let out = reconcile_str(
            "E;S;x\nL;S;I\nS;S;I;1;SITE1;3;4.5;1;A1;E;A;UN;0;Z;\n",
            &ReconcileOptions::default(),
        )
        .unwrap();
        let v = serde_json::to_value(&out.report).unwrap();
        assert_eq!(v["strategy"], "FIFO");
        assert_eq!(v["total_abs_discrepancy"], "1.5");
        assert_eq!(v["adjusted_lines"], 1);

        let kv = out.report.to_kv_lines();
        assert!(kv.contains(&"total_abs_discrepancy=1.5".to_string()));
        assert!(kv.contains(&"degraded_lots=".to_string()));
    }
}

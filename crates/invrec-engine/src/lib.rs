//! invrec-engine
//!
//! Reconciliation of physical counts against theoretical stock.
//!
//! parse → group by (article, site) → classify lots → compute discrepancies
//! → redistribute lot-less surplus → assemble.
//!
//! Pure and re-entrant: every call owns its data, nothing is shared between
//! runs. IO is limited to [`reconcile_file`].

mod aggregate;
mod assemble;
mod classifier;
mod discrepancy;
mod distribute;
mod error;
mod grouping;
mod redistribute;
mod report;

use std::path::Path;

use invrec_config::ReconcileConfig;
use invrec_records::{parse_file, parse_str, InventoryFile, Session, DEFAULT_DELIMITER};
use tracing::info;

pub use aggregate::{aggregate_session, Aggregate, AggregateKey};
pub use assemble::assemble;
pub use classifier::{
    AllocationStrategy, LotClassification, LotClassifier, LotTier, DEFAULT_LOTECART_TOKEN,
};
pub use discrepancy::{compute, Discrepancy, DiscrepancyKind, Indicator};
pub use distribute::{distribute_counts, DistributionSummary};
pub use error::EngineError;
pub use grouping::{group_by_article, ArticleKey};
pub use redistribute::{redistribute, Adjustment, Disposition, GroupOutcome, SynthesizedLine};
pub use report::ReconcileReport;

#[derive(Clone, Debug)]
pub struct ReconcileOptions {
    pub strategy: AllocationStrategy,
    pub classifier: LotClassifier,
    pub delimiter: char,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            strategy: AllocationStrategy::Fifo,
            classifier: LotClassifier::default(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl ReconcileOptions {
    pub fn from_config(cfg: &ReconcileConfig) -> Result<Self, EngineError> {
        let strategy = cfg
            .engine
            .strategy
            .parse::<AllocationStrategy>()
            .map_err(EngineError::Config)?;
        let classifier = LotClassifier::from_settings(&cfg.lots, &cfg.engine.lotecart_token)
            .map_err(|e| EngineError::Config(format!("lot patterns: {e}")))?;
        let delimiter = cfg
            .delimiter()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(Self {
            strategy,
            classifier,
            delimiter,
        })
    }

    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Engine decisions for one session.
#[derive(Clone, Debug, Default)]
pub struct SessionOutcome {
    /// Indexed like `Session::lines`.
    pub adjustments: Vec<Adjustment>,
    pub synthesized: Vec<SynthesizedLine>,
    pub degraded_lots: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ReconcileOutput {
    pub text: String,
    pub report: ReconcileReport,
}

pub fn reconcile_session(
    session: &Session,
    opts: &ReconcileOptions,
) -> Result<SessionOutcome, EngineError> {
    let mut indexed: Vec<(usize, Adjustment)> = Vec::with_capacity(session.lines.len());
    let mut synthesized = Vec::new();
    let mut degraded_lots = Vec::new();

    for (key, members) in group_by_article(session) {
        let g = redistribute(session, &key, &members, &opts.classifier, opts.strategy)?;
        indexed.extend(g.adjustments);
        synthesized.extend(g.synthesized);
        degraded_lots.extend(g.degraded_lots);
    }
    indexed.sort_by_key(|(i, _)| *i);
    // Groups come out in key order; emission follows the file.
    synthesized.sort_by_key(|s: &SynthesizedLine| (s.after, s.source));

    Ok(SessionOutcome {
        adjustments: indexed.into_iter().map(|(_, a)| a).collect(),
        synthesized,
        degraded_lots,
    })
}

/// Reconcile an already parsed file. Fails as a whole: no output when any
/// session fails.
pub fn reconcile(
    file: &InventoryFile,
    opts: &ReconcileOptions,
) -> Result<ReconcileOutput, EngineError> {
    let mut report = ReconcileReport::new(opts.strategy);
    let mut outcomes = Vec::with_capacity(file.sessions.len());
    for session in &file.sessions {
        let outcome = reconcile_session(session, opts)?;
        report.record_session(session, &outcome);
        info!(
            session_id = session.session_id(),
            lines = session.lines.len(),
            synthesized = outcome.synthesized.len(),
            strategy = %opts.strategy,
            "session reconciled"
        );
        outcomes.push(outcome);
    }
    Ok(ReconcileOutput {
        text: assemble(file, &outcomes),
        report,
    })
}

pub fn reconcile_str(src: &str, opts: &ReconcileOptions) -> Result<ReconcileOutput, EngineError> {
    let file = parse_str(src, opts.delimiter)?;
    reconcile(&file, opts)
}

pub fn reconcile_file(
    path: &Path,
    opts: &ReconcileOptions,
) -> Result<ReconcileOutput, EngineError> {
    let file = parse_file(path, opts.delimiter)?;
    info!(
        path = %path.display(),
        sessions = file.sessions.len(),
        stock_lines = file.stock_line_count(),
        "file parsed"
    );
    reconcile(&file, opts)
}

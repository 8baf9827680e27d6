use invrec_engine::{aggregate_session, LotClassifier};
use invrec_records::{format_quantity, InventoryFile};
use tracing::info;

use crate::{TemplateError, TEMPLATE_COLUMNS};

/// One row per aggregate of every session, sessions in file order, each
/// session's aggregates oldest lot first. `counted_qty` is left empty.
pub fn render_template(
    file: &InventoryFile,
    classifier: &LotClassifier,
) -> Result<String, TemplateError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(TEMPLATE_COLUMNS)?;

    let mut rows = 0usize;
    for session in &file.sessions {
        for agg in aggregate_session(session, classifier) {
            let theoretical = format_quantity(agg.theoretical_total);
            w.write_record([
                agg.session_id.as_str(),
                agg.inventory_id.as_str(),
                agg.key.article.as_str(),
                agg.key.stock_status.as_str(),
                theoretical.as_str(),
                "",
                agg.key.unit.as_str(),
                agg.key.zone.as_str(),
                agg.key.location.as_str(),
            ])?;
            rows += 1;
        }
    }

    let bytes = w
        .into_inner()
        .map_err(|e| TemplateError::Csv(e.into_error().into()))?;
    info!(sessions = file.sessions.len(), rows, "counting template rendered");
    // Every field came from UTF-8 strings.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

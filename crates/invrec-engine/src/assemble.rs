//! File Assembler.
//!
//! Records come out in source order. Only three fields of a stock line can
//! change: theoretical quantity (replaced when the adjusted value differs),
//! indicator, and the lot of relotted and synthesized lines. Everything else
//! is re-joined exactly as read. A moved line is written once, as its
//! synthesized replacement after the last line of its inventory list.

use std::collections::HashMap;

use invrec_records::{col, format_quantity, set_field, InventoryFile, RecordSlot, StockLine};

use crate::{Adjustment, Disposition, SessionOutcome, SynthesizedLine};

pub fn assemble(file: &InventoryFile, outcomes: &[SessionOutcome]) -> String {
    let trailing: Vec<HashMap<usize, Vec<&SynthesizedLine>>> = outcomes
        .iter()
        .map(|o| {
            let mut by_anchor: HashMap<usize, Vec<&SynthesizedLine>> = HashMap::new();
            for s in &o.synthesized {
                by_anchor.entry(s.after).or_default().push(s);
            }
            by_anchor
        })
        .collect();

    let mut out = String::new();
    let mut push = |record: String| {
        out.push_str(&record);
        out.push_str(file.line_ending);
    };

    for slot in &file.layout {
        match *slot {
            RecordSlot::Header { session } => push(file.join(&file.sessions[session].header.fields)),
            RecordSlot::List { session, list } => {
                push(file.join(&file.sessions[session].lists[list].fields))
            }
            RecordSlot::Stock { session, line } => {
                let stock = &file.sessions[session].lines[line];
                let adj = &outcomes[session].adjustments[line];
                if adj.disposition != Disposition::Moved {
                    push(render_stock(file, stock, adj));
                }
                if let Some(extra) = trailing[session].get(&line) {
                    for s in extra {
                        push(render_stock(file, &s.line, &s.adjustment));
                    }
                }
            }
        }
    }
    out
}

fn render_stock(file: &InventoryFile, line: &StockLine, adj: &Adjustment) -> String {
    let mut fields = line.fields.clone();
    if adj.adjusted != line.theoretical {
        set_field(&mut fields, col::QUANTITY, format_quantity(adj.adjusted));
    }
    set_field(&mut fields, col::INDICATOR, adj.indicator.as_field());
    if let Some(lot) = &adj.lot {
        set_field(&mut fields, col::LOT, lot.as_str());
    }
    file.join(&fields)
}

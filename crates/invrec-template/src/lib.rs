//! invrec-template
//!
//! Counting template: one row per physical pile (aggregate) for the operator
//! to fill in, and the way back from a completed template to per-line
//! counts.
//!
//! CSV columns, in order:
//! `session_id,inventory_id,article,stock_status,theoretical_qty,counted_qty,unit,zone,location`

mod completed;
mod error;
mod render;

pub use completed::{apply_completed_template, parse_completed_template, CompletedCount};
pub use error::TemplateError;
pub use render::render_template;

pub const TEMPLATE_COLUMNS: [&str; 9] = [
    "session_id",
    "inventory_id",
    "article",
    "stock_status",
    "theoretical_qty",
    "counted_qty",
    "unit",
    "zone",
    "location",
];

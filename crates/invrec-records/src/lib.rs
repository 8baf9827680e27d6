//! invrec-records
//!
//! Record Model for the ERP inventory flat file.
//!
//! A file is a sequence of delimiter-separated records, one per line, whose
//! first field is the record type:
//! - `E` session header (one per session)
//! - `L` inventory list / counting pass (one or more per session)
//! - `S` stock detail (one per countable line, joined to its `L` by inventory id)
//!
//! Parsing is strict: every structural problem is a [`ValidationError`]
//! carrying the 1-based physical line number. Every raw field is kept as
//! written so untouched fields can be re-emitted byte for byte.
//!
//! Pure logic apart from [`parse_file`]. No knowledge of reconciliation.

mod error;
mod inspect;
mod parser;
mod quantity;
mod types;

pub use error::{RecordError, ValidationError, ValidationKind};
pub use inspect::{inspect_str, FormatInspection, DEFAULT_INSPECT_LINES};
pub use parser::{inventory_date, parse_file, parse_str, DEFAULT_DELIMITER};
pub use quantity::{format_quantity, parse_quantity, QuantityError};
pub use types::*;

/// `S` record column positions (0-indexed).
pub mod col {
    pub const RECORD_TYPE: usize = 0;
    pub const SESSION_ID: usize = 1;
    pub const INVENTORY_ID: usize = 2;
    pub const RANK: usize = 3;
    pub const SITE: usize = 4;
    /// Theoretical quantity on input, adjusted quantity on output.
    pub const QUANTITY: usize = 5;
    /// Counted quantity as entered by the operator (traceability field).
    pub const COUNTED: usize = 6;
    pub const INDICATOR: usize = 7;
    pub const ARTICLE: usize = 8;
    pub const LOCATION: usize = 9;
    pub const STOCK_STATUS: usize = 10;
    pub const UNIT: usize = 11;
    pub const RESERVED: usize = 12;
    pub const ZONE: usize = 13;
    pub const LOT: usize = 14;
}

/// Minimum number of fields in an `S` record.
pub const STOCK_FIELD_COUNT: usize = 15;
/// Minimum number of fields in an `E` record (type + session id).
pub const HEADER_FIELD_COUNT: usize = 2;
/// Minimum number of fields in an `L` record (type + session id + inventory id).
pub const LIST_FIELD_COUNT: usize = 3;

/// Column names of an `S` record, in file order.
pub const STOCK_COLUMN_NAMES: [&str; STOCK_FIELD_COUNT] = [
    "record_type",
    "session_id",
    "inventory_id",
    "rank",
    "site",
    "quantity",
    "counted_quantity",
    "indicator",
    "article",
    "location",
    "stock_status",
    "unit",
    "reserved",
    "zone",
    "lot",
];

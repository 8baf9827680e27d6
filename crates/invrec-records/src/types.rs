use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::col;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// `E` record. Opens one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeader {
    pub line: usize,
    pub fields: Vec<String>,
}

impl SessionHeader {
    pub fn session_id(&self) -> &str {
        field(&self.fields, col::SESSION_ID)
    }
}

/// `L` record. One counting pass / zone of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryList {
    pub line: usize,
    pub fields: Vec<String>,
}

impl InventoryList {
    pub fn session_id(&self) -> &str {
        field(&self.fields, col::SESSION_ID)
    }

    pub fn inventory_id(&self) -> &str {
        field(&self.fields, col::INVENTORY_ID)
    }
}

/// Where a stock line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOrigin {
    /// Read from the input file at this 1-based physical line.
    Parsed { line: usize },
    /// Created by the engine (reserved-token lot).
    Synthesized,
}

/// `S` record. One countable unit.
///
/// `fields` holds every raw field as written; the engine only ever replaces
/// the quantity, indicator and (for synthesized lines) lot fields on output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockLine {
    pub origin: LineOrigin,
    pub fields: Vec<String>,
    /// Theoretical quantity as recorded by the ERP.
    pub theoretical: Decimal,
    /// Counted quantity as entered by the operator. `None` while the field
    /// is still empty (raw export, count not yet entered).
    pub counted: Option<Decimal>,
}

impl StockLine {
    pub fn line(&self) -> Option<usize> {
        match self.origin {
            LineOrigin::Parsed { line } => Some(line),
            LineOrigin::Synthesized => None,
        }
    }

    /// Line number for error reporting; synthesized lines report 0.
    pub fn line_or_zero(&self) -> usize {
        self.line().unwrap_or(0)
    }

    pub fn session_id(&self) -> &str {
        field(&self.fields, col::SESSION_ID)
    }

    pub fn inventory_id(&self) -> &str {
        field(&self.fields, col::INVENTORY_ID)
    }

    pub fn rank(&self) -> &str {
        field(&self.fields, col::RANK)
    }

    pub fn site(&self) -> &str {
        field(&self.fields, col::SITE)
    }

    /// Raw text of the counted field, exactly as it will be re-emitted.
    pub fn counted_raw(&self) -> &str {
        field(&self.fields, col::COUNTED)
    }

    pub fn article(&self) -> &str {
        field(&self.fields, col::ARTICLE)
    }

    pub fn location(&self) -> &str {
        field(&self.fields, col::LOCATION)
    }

    pub fn stock_status(&self) -> &str {
        field(&self.fields, col::STOCK_STATUS)
    }

    pub fn unit(&self) -> &str {
        field(&self.fields, col::UNIT)
    }

    pub fn zone(&self) -> &str {
        field(&self.fields, col::ZONE)
    }

    /// Lot identifier with surrounding whitespace removed. Empty when the
    /// line carries no lot.
    pub fn lot(&self) -> &str {
        field(&self.fields, col::LOT).trim()
    }

    /// Record a count for a line whose counted field is still open.
    /// Writes both the typed value and the raw traceability field.
    pub fn set_count(&mut self, counted: Decimal) {
        self.counted = Some(counted);
        set_field(&mut self.fields, col::COUNTED, crate::format_quantity(counted));
    }
}

fn field(fields: &[String], idx: usize) -> &str {
    fields.get(idx).map(String::as_str).unwrap_or("")
}

/// Overwrite one field, padding with empty fields if the record is short.
pub fn set_field(fields: &mut Vec<String>, idx: usize, value: impl Into<String>) {
    if fields.len() <= idx {
        fields.resize(idx + 1, String::new());
    }
    fields[idx] = value.into();
}

// ---------------------------------------------------------------------------
// Session / file
// ---------------------------------------------------------------------------

/// One inventory run: a header, one or more inventory lists, and the stock
/// lines attached to them (in file order).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub header: SessionHeader,
    pub lists: Vec<InventoryList>,
    pub lines: Vec<StockLine>,
}

impl Session {
    pub fn session_id(&self) -> &str {
        self.header.session_id()
    }

    pub fn has_list(&self, inventory_id: &str) -> bool {
        self.lists.iter().any(|l| l.inventory_id() == inventory_id)
    }

    /// Inventory id of the first list; used for session-level metadata.
    pub fn first_inventory_id(&self) -> Option<&str> {
        self.lists.first().map(InventoryList::inventory_id)
    }
}

/// Position of a record in the original file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordSlot {
    Header { session: usize },
    List { session: usize, list: usize },
    Stock { session: usize, line: usize },
}

/// A whole parsed file: sessions plus the original record order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryFile {
    pub sessions: Vec<Session>,
    /// Every non-blank record in source order.
    pub layout: Vec<RecordSlot>,
    pub delimiter: char,
    /// `"\r\n"` when the source used CRLF line endings, else `"\n"`.
    pub line_ending: &'static str,
}

impl InventoryFile {
    pub fn stock_line_count(&self) -> usize {
        self.sessions.iter().map(|s| s.lines.len()).sum()
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        let wanted = session_id.trim();
        self.sessions.iter().find(|s| s.session_id().trim() == wanted)
    }

    /// Re-join a record's fields with the file's delimiter.
    pub fn join(&self, fields: &[String]) -> String {
        let mut buf = [0u8; 4];
        fields.join(&*self.delimiter.encode_utf8(&mut buf))
    }
}

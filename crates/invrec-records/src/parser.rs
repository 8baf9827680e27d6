//! Flat-file parser.
//!
//! Records are collected in one pass, then joined: `L` to its session by
//! session id, `S` to its session and inventory list. Cross-references are
//! resolved after the whole file is read, so record order in the source does
//! not matter for validity (it is kept in [`InventoryFile::layout`] for
//! re-emission).

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::{
    col, parse_quantity, InventoryFile, InventoryList, LineOrigin, QuantityError, RecordError,
    RecordSlot, Session, SessionHeader, StockLine, ValidationError, ValidationKind,
    HEADER_FIELD_COUNT, LIST_FIELD_COUNT, STOCK_FIELD_COUNT,
};

pub const DEFAULT_DELIMITER: char = ';';

/// Read and parse a file from disk.
pub fn parse_file(path: &Path, delimiter: char) -> Result<InventoryFile, RecordError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RecordError::Io(format!("read '{}': {e}", path.display())))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| RecordError::Io(format!("'{}' is not UTF-8 text", path.display())))?;
    parse_str(&text, delimiter)
}

enum Pending {
    Header(SessionHeader),
    List(InventoryList),
    Stock(StockLine),
}

/// Parse flat-file text into the Record Model.
pub fn parse_str(src: &str, delimiter: char) -> Result<InventoryFile, RecordError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let line_ending = if src.contains("\r\n") { "\r\n" } else { "\n" };

    let mut pending: Vec<Pending> = Vec::new();
    for (idx, raw) in src.split('\n').enumerate() {
        let line_no = idx + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = raw.split(delimiter).map(str::to_string).collect();
        pending.push(parse_record(line_no, fields)?);
    }

    assemble(pending, delimiter, line_ending)
}

fn parse_record(line: usize, fields: Vec<String>) -> Result<Pending, ValidationError> {
    let record_type = fields
        .get(col::RECORD_TYPE)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let need = |min: usize| -> Result<(), ValidationError> {
        if fields.len() < min {
            return Err(ValidationError::new(
                line,
                ValidationKind::FieldCount {
                    record_type: record_type.clone(),
                    expected: min,
                    found: fields.len(),
                },
            ));
        }
        Ok(())
    };

    match record_type.as_str() {
        "E" => {
            need(HEADER_FIELD_COUNT)?;
            Ok(Pending::Header(SessionHeader { line, fields }))
        }
        "L" => {
            need(LIST_FIELD_COUNT)?;
            Ok(Pending::List(InventoryList { line, fields }))
        }
        "S" => {
            need(STOCK_FIELD_COUNT)?;
            let session_id = fields[col::SESSION_ID].clone();
            let ctx = |e: ValidationError| {
                e.in_session(session_id.clone())
                    .at_lot(fields[col::ARTICLE].clone(), fields[col::LOT].clone())
            };

            let theoretical = match parse_quantity(&fields[col::QUANTITY]) {
                Ok(q) if q < Decimal::ZERO => {
                    return Err(ctx(ValidationError::new(
                        line,
                        ValidationKind::NegativeQuantity {
                            field: "theoretical",
                            value: q,
                        },
                    )))
                }
                Ok(q) => q,
                Err(_) => {
                    return Err(ctx(ValidationError::new(
                        line,
                        ValidationKind::InvalidQuantity {
                            field: "theoretical",
                            raw: fields[col::QUANTITY].clone(),
                        },
                    )))
                }
            };

            let counted = match parse_quantity(&fields[col::COUNTED]) {
                Err(QuantityError::Empty) => None,
                Err(QuantityError::Invalid(raw)) => {
                    return Err(ctx(ValidationError::new(
                        line,
                        ValidationKind::InvalidQuantity {
                            field: "counted",
                            raw,
                        },
                    )))
                }
                Ok(q) if q < Decimal::ZERO => {
                    return Err(ctx(ValidationError::new(
                        line,
                        ValidationKind::NegativeQuantity {
                            field: "counted",
                            value: q,
                        },
                    )))
                }
                Ok(q) => Some(q),
            };

            Ok(Pending::Stock(StockLine {
                origin: LineOrigin::Parsed { line },
                fields,
                theoretical,
                counted,
            }))
        }
        other => Err(ValidationError::new(
            line,
            ValidationKind::UnknownRecordType(other.to_string()),
        )),
    }
}

fn assemble(
    pending: Vec<Pending>,
    delimiter: char,
    line_ending: &'static str,
) -> Result<InventoryFile, RecordError> {
    // Pass 1: sessions, in header order.
    let mut sessions: Vec<Session> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for p in &pending {
        if let Pending::Header(h) = p {
            let id = h.session_id().to_string();
            if by_id.contains_key(&id) {
                return Err(ValidationError::new(h.line, ValidationKind::DuplicateSession(id))
                    .into());
            }
            by_id.insert(id, sessions.len());
            sessions.push(Session {
                header: h.clone(),
                lists: Vec::new(),
                lines: Vec::new(),
            });
        }
    }
    if sessions.is_empty() {
        if let Some(first) = pending.iter().find_map(|p| match p {
            Pending::List(l) => Some((l.line, l.session_id().to_string())),
            Pending::Stock(s) => Some((s.line_or_zero(), s.session_id().to_string())),
            Pending::Header(_) => None,
        }) {
            return Err(ValidationError::new(first.0, ValidationKind::UnknownSession(first.1))
                .into());
        }
        return Err(RecordError::NoSessions);
    }

    // Pass 2: lists.
    let mut layout: Vec<RecordSlot> = Vec::with_capacity(pending.len());
    let mut slots: Vec<Option<RecordSlot>> = vec![None; pending.len()];
    for (i, p) in pending.iter().enumerate() {
        match p {
            Pending::Header(h) => {
                slots[i] = Some(RecordSlot::Header {
                    session: by_id[h.session_id()],
                });
            }
            Pending::List(l) => {
                let Some(&s) = by_id.get(l.session_id()) else {
                    return Err(ValidationError::new(
                        l.line,
                        ValidationKind::UnknownSession(l.session_id().to_string()),
                    )
                    .into());
                };
                if sessions[s].has_list(l.inventory_id()) {
                    return Err(ValidationError::new(
                        l.line,
                        ValidationKind::DuplicateInventoryList(l.inventory_id().to_string()),
                    )
                    .in_session(l.session_id())
                    .into());
                }
                slots[i] = Some(RecordSlot::List {
                    session: s,
                    list: sessions[s].lists.len(),
                });
                sessions[s].lists.push(l.clone());
            }
            Pending::Stock(_) => {}
        }
    }

    // Sessions without any list are rejected before stock lines are looked at.
    for s in &sessions {
        if s.lists.is_empty() {
            return Err(RecordError::EmptySession {
                session_id: s.session_id().to_string(),
                line: s.header.line,
            });
        }
    }

    // Pass 3: stock lines.
    for (i, p) in pending.into_iter().enumerate() {
        if let Pending::Stock(line) = p {
            let line_no = line.line_or_zero();
            let Some(&s) = by_id.get(line.session_id()) else {
                return Err(ValidationError::new(
                    line_no,
                    ValidationKind::UnknownSession(line.session_id().to_string()),
                )
                .into());
            };
            if !sessions[s].has_list(line.inventory_id()) {
                return Err(ValidationError::new(
                    line_no,
                    ValidationKind::UnknownInventoryList(line.inventory_id().to_string()),
                )
                .in_session(line.session_id())
                .at_lot(line.article(), line.lot())
                .into());
            }
            slots[i] = Some(RecordSlot::Stock {
                session: s,
                line: sessions[s].lines.len(),
            });
            sessions[s].lines.push(line);
        }
    }

    layout.extend(slots.into_iter().flatten());

    Ok(InventoryFile {
        sessions,
        layout,
        delimiter,
        line_ending,
    })
}

// ---------------------------------------------------------------------------
// Inventory date
// ---------------------------------------------------------------------------

fn inventory_date_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})(\d{2})INV").ok()).as_ref()
}

/// Extract the inventory date from an inventory id such as `2506INV001`:
/// the `DDMM` block right before the literal `INV`, in `reference_year`.
/// Returns `None` when the block is absent or not a real calendar date.
pub fn inventory_date(inventory_id: &str, reference_year: i32) -> Option<NaiveDate> {
    let caps = inventory_date_re()?.captures(inventory_id)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(reference_year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s_line(inv: &str, theo: &str, counted: &str, article: &str, lot: &str) -> String {
        format!("S;SES1;{inv};1000;SITE1;{theo};{counted};1;{article};EMP01;A;UN;0;ZONE1;{lot}")
    }

    #[test]
    fn parses_minimal_session() {
        let src = format!(
            "E;SES1;Inventaire;1;SITE1\nL;SES1;2506INV01;1;SITE1\n{}\n",
            s_line("2506INV01", "25", "", "ART1", "LOT010125")
        );
        let f = parse_str(&src, ';').unwrap();
        assert_eq!(f.sessions.len(), 1);
        let s = &f.sessions[0];
        assert_eq!(s.session_id(), "SES1");
        assert_eq!(s.lists.len(), 1);
        assert_eq!(s.lines.len(), 1);
        assert_eq!(s.lines[0].theoretical, Decimal::from(25));
        assert_eq!(s.lines[0].counted, None);
        assert_eq!(s.lines[0].line(), Some(3));
        assert_eq!(f.layout.len(), 3);
        assert_eq!(f.line_ending, "\n");
    }

    #[test]
    fn blank_lines_skipped_but_numbering_is_physical() {
        let src = format!(
            "E;SES1;x\n\nL;SES1;INV1\n\n{}",
            s_line("INV1", "x", "", "ART1", "")
        );
        let err = parse_str(&src, ';').unwrap_err();
        match err {
            RecordError::Validation(v) => {
                assert_eq!(v.line, 5);
                assert!(matches!(v.kind, ValidationKind::InvalidQuantity { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn crlf_and_bom_handled() {
        let src = format!(
            "\u{feff}E;SES1;x\r\nL;SES1;INV1\r\n{}\r\n",
            s_line("INV1", "3", "3", "ART1", "")
        );
        let f = parse_str(&src, ';').unwrap();
        assert_eq!(f.line_ending, "\r\n");
        assert_eq!(f.sessions[0].header.fields[0], "E");
        assert_eq!(f.sessions[0].lines[0].fields[14], "");
    }

    #[test]
    fn inventory_date_extracted_before_inv_marker() {
        assert_eq!(
            inventory_date("2506INV001", 2025),
            NaiveDate::from_ymd_opt(2025, 6, 25)
        );
        assert_eq!(inventory_date("3113INV001", 2025), None);
        assert_eq!(inventory_date("NOPE", 2025), None);
    }
}

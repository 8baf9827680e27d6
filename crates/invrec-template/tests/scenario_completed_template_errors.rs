//! A completed template is rejected with the offending row when it cannot
//! be trusted.

use invrec_engine::{AllocationStrategy, EngineError, LotClassifier};
use invrec_records::parse_str;
use invrec_template::{apply_completed_template, parse_completed_template, TemplateError};
use rust_decimal::Decimal;

const HEADER: &str =
    "session_id,inventory_id,article,stock_status,theoretical_qty,counted_qty,unit,zone,location\n";

#[test]
fn empty_count_reports_row() {
    let text = format!("{HEADER}SES1,INV1,ART1,A,10,12,UN,Z1,EMP\nSES1,INV1,ART2,A,3,,UN,Z1,EMP\n");
    match parse_completed_template(&text).unwrap_err() {
        TemplateError::EmptyCount { row } => assert_eq!(row, 3),
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn negative_and_garbage_counts_rejected() {
    let text = format!("{HEADER}SES1,INV1,ART1,A,10,-1,UN,Z1,EMP\n");
    assert!(matches!(
        parse_completed_template(&text).unwrap_err(),
        TemplateError::NegativeCount { row: 2, .. }
    ));
    let text = format!("{HEADER}SES1,INV1,ART1,A,10,douze,UN,Z1,EMP\n");
    match parse_completed_template(&text).unwrap_err() {
        TemplateError::InvalidCount { row, raw } => {
            assert_eq!(row, 2);
            assert_eq!(raw, "douze");
        }
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn missing_column_named() {
    let text = "session_id,inventory_id,article,stock_status,theoretical_qty,unit,zone,location\n";
    assert!(matches!(
        parse_completed_template(text).unwrap_err(),
        TemplateError::MissingColumn("counted_qty")
    ));
}

#[test]
fn header_only_template_rejected() {
    assert!(matches!(
        parse_completed_template(HEADER).unwrap_err(),
        TemplateError::Empty
    ));
}

#[test]
fn reordered_and_extra_columns_accepted() {
    let text = "note,counted_qty,location,zone,unit,theoretical_qty,stock_status,article,inventory_id,session_id\n\
checked twice, 7 ,EMP,Z1,UN,10,A,ART1,INV1,SES1\n";
    let rows = parse_completed_template(text).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].counted, Decimal::from(7));
    assert_eq!(rows[0].key.article, "ART1");
    assert_eq!(rows[0].key.location, "EMP");
}

fn raw_file() -> invrec_records::InventoryFile {
    parse_str(
        "E;SES1;x\nL;SES1;INV1\nS;SES1;INV1;1;SITE1;10;;1;ART1;EMP;A;UN;0;Z1;LOT010125\n",
        ';',
    )
    .unwrap()
}

#[test]
fn unknown_session_rejected() {
    let rows =
        parse_completed_template(&format!("{HEADER}SES9,INV1,ART1,A,10,10,UN,Z1,EMP\n")).unwrap();
    let mut file = raw_file();
    let err = apply_completed_template(
        &mut file,
        &rows,
        AllocationStrategy::Fifo,
        &LotClassifier::default(),
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::UnknownSession { row: 2, .. }));
}

#[test]
fn duplicate_row_rejected() {
    let rows = parse_completed_template(&format!(
        "{HEADER}SES1,INV1,ART1,A,10,10,UN,Z1,EMP\nSES1,INV1,ART1,A,10,11,UN,Z1,EMP\n"
    ))
    .unwrap();
    let mut file = raw_file();
    let err = apply_completed_template(
        &mut file,
        &rows,
        AllocationStrategy::Fifo,
        &LotClassifier::default(),
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::DuplicateRow { row: 3, .. }));
}

#[test]
fn pile_missing_from_template_rejected_and_file_untouched() {
    let rows =
        parse_completed_template(&format!("{HEADER}SES1,INV1,ART1,A,10,4,UN,Z9,EMP\n")).unwrap();
    let mut file = raw_file();
    let before = file.clone();
    let err = apply_completed_template(
        &mut file,
        &rows,
        AllocationStrategy::Fifo,
        &LotClassifier::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Engine(EngineError::UnknownAggregate { .. })
    ));
    assert_eq!(file, before);
}

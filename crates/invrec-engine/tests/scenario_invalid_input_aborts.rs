//! Invalid input stops the run with the offending line; no output is
//! produced for any session.

use invrec_engine::{reconcile_file, reconcile_str, EngineError, ReconcileOptions};
use invrec_records::{RecordError, ValidationKind};

#[test]
fn empty_count_reported_with_context() {
    let input = "\
E;SES1;x
L;SES1;INV1
S;SES1;INV1;1;SITE1;5;5;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;INV1;2;SITE1;5;;1;ART9;EMP01;A;UN;0;ZONE1;LOT020125
";
    let err = reconcile_str(input, &ReconcileOptions::default()).unwrap_err();
    assert!(err.is_validation());
    match err {
        EngineError::Validation(v) => {
            assert_eq!(v.line, 4);
            assert_eq!(v.kind, ValidationKind::MissingCount);
            assert_eq!(v.session_id.as_deref(), Some("SES1"));
            assert_eq!(v.article.as_deref(), Some("ART9"));
            assert_eq!(v.lot.as_deref(), Some("LOT020125"));
        }
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn negative_count_rejected() {
    let input = "E;SES1;x\nL;SES1;INV1\nS;SES1;INV1;1;SITE1;5;-1;1;ART1;EMP01;A;UN;0;ZONE1;\n";
    let err = reconcile_str(input, &ReconcileOptions::default()).unwrap_err();
    assert!(matches!(err, EngineError::Record(RecordError::Validation(_))));
}

#[test]
fn session_without_list_rejected_before_computation() {
    let input = "\
E;SES1;x
L;SES1;INV1
S;SES1;INV1;1;SITE1;5;5;1;ART1;EMP01;A;UN;0;ZONE1;
E;SES2;y
";
    let err = reconcile_str(input, &ReconcileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Record(RecordError::EmptySession { ref session_id, .. }) if session_id == "SES2"
    ));
}

#[test]
fn missing_file_is_not_a_validation_error() {
    let err = reconcile_file(
        std::path::Path::new("/no/such/export.csv"),
        &ReconcileOptions::default(),
    )
    .unwrap_err();
    assert!(!err.is_validation());
}

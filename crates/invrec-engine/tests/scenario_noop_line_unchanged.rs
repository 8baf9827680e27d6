//! A line whose count matches its theoretical quantity is re-emitted as is.

use invrec_engine::{reconcile_str, ReconcileOptions};

#[test]
fn matching_count_is_a_no_op() {
    let input = "\
E;SES1;Inventaire;1;SITE1
L;SES1;INV1;1;SITE1
S;SES1;INV1;1000;SITE1;25;25;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
";
    let out = reconcile_str(input, &ReconcileOptions::default()).unwrap();
    assert_eq!(out.text, input);

    let fields: Vec<&str> = out.text.lines().nth(2).unwrap().split(';').collect();
    assert_eq!(fields[5], "25");
    assert_eq!(fields[6], "25");
    assert_eq!(fields[7], "1");
    assert_eq!(out.report.unchanged_lines, 1);
    assert_eq!(out.report.adjusted_lines, 0);
}

#[test]
fn decimal_scale_of_untouched_quantity_kept() {
    let input = "E;SES1;x\nL;SES1;INV1\nS;SES1;INV1;1;SITE1;25.000;25;1;ART1;EMP01;A;UN;0;ZONE1;\n";
    let out = reconcile_str(input, &ReconcileOptions::default()).unwrap();
    assert_eq!(out.text, input);
}

#[test]
fn stale_indicator_is_reset() {
    let input = "E;SES1;x\nL;SES1;INV1\nS;SES1;INV1;1;SITE1;4;4;2;ART1;EMP01;A;UN;0;ZONE1;\n";
    let out = reconcile_str(input, &ReconcileOptions::default()).unwrap();
    assert!(out.text.ends_with("S;SES1;INV1;1;SITE1;4;4;1;ART1;EMP01;A;UN;0;ZONE1;\n"));
}

#[test]
fn crlf_line_endings_preserved() {
    let input = "E;SES1;x\r\nL;SES1;INV1\r\nS;SES1;INV1;1;SITE1;4;6;1;ART1;EMP01;A;UN;0;ZONE1;\r\n";
    let out = reconcile_str(input, &ReconcileOptions::default()).unwrap();
    assert_eq!(
        out.text,
        "E;SES1;x\r\nL;SES1;INV1\r\nS;SES1;INV1;1;SITE1;6;6;2;ART1;EMP01;A;UN;0;ZONE1;\r\n"
    );
}

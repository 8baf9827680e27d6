//! Reconciling an already reconciled file changes no quantity.

use invrec_engine::{reconcile_str, AllocationStrategy, ReconcileOptions};

const CORRECTIONS: &str = "\
E;SES1;Inventaire;1;SITE1
L;SES1;INV1;1;SITE1
S;SES1;INV1;1000;SITE1;10;7;1;ART1;EMP01;A;UN;0;ZONE1;CPKU070725A001
S;SES1;INV1;2000;SITE1;5;9.5;1;ART1;EMP01;A;UN;0;ZONE1;LOT311224
S;SES1;INV1;3000;SITE1;3;3;1;ART2;EMP01;A;UN;0;ZONE1;XYZ99
L;SES1;INV2;2;SITE1
S;SES1;INV2;1000;SITE1;8;0;1;ART3;EMP02;A;UN;0;ZONE2;LOT010224
";

/// Lot-less counts: one group with no lot to take, one with an empty lot
/// row, one with an existing reserved-token row.
const LOTLESS: &str = "\
E;SES1;Inventaire;1;SITE1
L;SES1;INV1;1;SITE1
S;SES1;INV1;1000;SITE1;0;10;1;ART2;EMP01;A;UN;0;ZONE1;
S;SES1;INV1;2000;SITE1;0;4;1;ART2;EMP01;A;UN;0;ZONE3;
S;SES1;INV1;3000;SITE1;2;2;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;INV1;4000;SITE1;0;0;1;ART5;EMP01;A;UN;0;ZONE1;LOT150625
S;SES1;INV1;5000;SITE1;0;10;1;ART5;EMP01;A;UN;0;ZONE1;
L;SES1;INV2;2;SITE1
S;SES1;INV2;1000;SITE1;0;1;1;ART6;EMP02;A;UN;0;ZONE2;LOTECART
S;SES1;INV2;2000;SITE1;0;6;1;ART6;EMP02;A;UN;0;ZONE2;
";

/// (adjusted, counted, lot) of every stock line, in output order.
fn quantities(text: &str) -> Vec<(String, String, String)> {
    text.lines()
        .filter(|l| l.starts_with("S;"))
        .map(|l| {
            let f: Vec<&str> = l.split(';').collect();
            (f[5].to_string(), f[6].to_string(), f[14].to_string())
        })
        .collect()
}

#[test]
fn balanced_file_is_returned_unchanged() {
    let input = "\
E;SES1;x
L;SES1;INV1
S;SES1;INV1;1;SITE1;25;25;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;INV1;2;SITE1;3.5;3.5;1;ART2;EMP01;A;UN;0;ZONE1;
";
    let out = reconcile_str(input, &ReconcileOptions::default()).unwrap();
    assert_eq!(out.text, input);
    assert_eq!(out.report.adjusted_lines, 0);
}

#[test]
fn second_run_keeps_quantities_and_third_run_is_a_fixpoint() {
    for input in [CORRECTIONS, LOTLESS] {
        for strategy in [AllocationStrategy::Fifo, AllocationStrategy::Lifo] {
            let opts = ReconcileOptions::default().with_strategy(strategy);
            let first = reconcile_str(input, &opts).unwrap();
            let second = reconcile_str(&first.text, &opts).unwrap();
            let third = reconcile_str(&second.text, &opts).unwrap();

            assert_eq!(quantities(&first.text), quantities(&second.text));
            assert_eq!(second.report.adjusted_lines, 0);
            assert_eq!(second.report.synthesized_lines, 0);
            assert_eq!(second.report.relotted_lines, 0);
            assert_eq!(second.text, third.text);
        }
    }
}

#[test]
fn lotless_output_is_settled_after_one_run() {
    let first = reconcile_str(LOTLESS, &ReconcileOptions::default()).unwrap();
    assert_eq!(first.report.synthesized_lines, 2);
    assert_eq!(first.report.relotted_lines, 2);

    let expected = "\
E;SES1;Inventaire;1;SITE1
L;SES1;INV1;1;SITE1
S;SES1;INV1;3000;SITE1;2;2;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;INV1;4000;SITE1;0;0;1;ART5;EMP01;A;UN;0;ZONE1;LOT150625
S;SES1;INV1;5000;SITE1;10;10;2;ART5;EMP01;A;UN;0;ZONE1;LOT150625
S;SES1;INV1;1000;SITE1;10;10;2;ART2;EMP01;A;UN;0;ZONE1;LOTECART
S;SES1;INV1;2000;SITE1;4;4;2;ART2;EMP01;A;UN;0;ZONE3;LOTECART
L;SES1;INV2;2;SITE1
S;SES1;INV2;1000;SITE1;1;1;2;ART6;EMP02;A;UN;0;ZONE2;LOTECART
S;SES1;INV2;2000;SITE1;6;6;2;ART6;EMP02;A;UN;0;ZONE2;LOTECART
";
    assert_eq!(first.text, expected);

    // Every line now carries what was counted on it.
    for (adjusted, counted, _) in quantities(&first.text) {
        assert_eq!(adjusted, counted);
    }
}

//! Raw export → template → operator counts → final file.

use invrec_engine::{reconcile, ReconcileOptions};
use invrec_records::parse_str;
use invrec_template::{apply_completed_template, parse_completed_template, render_template};

const RAW: &str = "\
E;SES1;Inventaire;1;SITE1
L;SES1;2506INV01;1;SITE1
S;SES1;2506INV01;1000;SITE1;10;;1;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;2506INV01;2000;SITE1;5;;1;ART1;EMP01;A;UN;0;ZONE1;LOT010325
S;SES1;2506INV01;3000;SITE1;4;;1;ART2;EMP01;A;UN;0;ZONE1;LOT050125
";

/// Fill the counted column the way an operator would.
fn fill(template: &str, counts: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (i, line) in template.lines().enumerate() {
        if i == 0 {
            out.push_str(line);
        } else {
            let mut f: Vec<&str> = line.split(',').collect();
            let (_, c) = counts
                .iter()
                .find(|(art, _)| *art == f[2])
                .expect("count for article");
            f[5] = *c;
            out.push_str(&f.join(","));
        }
        out.push('\n');
    }
    out
}

#[test]
fn operator_counts_flow_into_final_file() {
    let opts = ReconcileOptions::default();
    let mut file = parse_str(RAW, ';').unwrap();

    let template = render_template(&file, &opts.classifier).unwrap();
    let completed = fill(&template, &[("ART1", "13"), ("ART2", "4")]);
    let rows = parse_completed_template(&completed).unwrap();
    let summaries =
        apply_completed_template(&mut file, &rows, opts.strategy, &opts.classifier).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].aggregates, 2);

    let out = reconcile(&file, &opts).unwrap();
    let expected = "\
E;SES1;Inventaire;1;SITE1
L;SES1;2506INV01;1;SITE1
S;SES1;2506INV01;1000;SITE1;8;8;2;ART1;EMP01;A;UN;0;ZONE1;LOT010125
S;SES1;2506INV01;2000;SITE1;5;5;1;ART1;EMP01;A;UN;0;ZONE1;LOT010325
S;SES1;2506INV01;3000;SITE1;4;4;1;ART2;EMP01;A;UN;0;ZONE1;LOT050125
";
    assert_eq!(out.text, expected);
    assert_eq!(out.report.adjusted_lines, 1);
}

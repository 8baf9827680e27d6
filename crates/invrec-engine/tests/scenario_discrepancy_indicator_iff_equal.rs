//! For positive theoretical quantities the indicator is UNCHANGED exactly
//! when the count equals the theoretical value, and the delta is always
//! `counted - theoretical`.

use invrec_engine::{compute, Indicator};
use rust_decimal::Decimal;

#[test]
fn indicator_unchanged_iff_equal_over_a_range() {
    let values: Vec<Decimal> = (0..=12)
        .map(Decimal::from)
        .chain([Decimal::new(125, 1), Decimal::new(12500, 3), Decimal::new(1, 3)])
        .collect();

    for &t in values.iter().filter(|t| !t.is_zero()) {
        for &c in &values {
            let d = compute(t, c).unwrap();
            assert_eq!(d.delta, c - t, "delta for ({t}, {c})");
            assert_eq!(
                d.indicator == Indicator::Unchanged,
                t == c,
                "indicator for ({t}, {c})"
            );
            assert_eq!(d.adjusted, c, "adjusted for ({t}, {c})");
        }
    }
}
